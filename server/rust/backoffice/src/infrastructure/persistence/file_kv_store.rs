use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::entity::table_event::TableEvent;
use crate::domain::repository::KeyValueStore;
use crate::infrastructure::event_bus::TableEventBus;

/// FileKeyValueStore は 1 キー 1 ファイルでディレクトリに永続化するキー・バリューストア。
/// 書き込みは一時ファイルへの書き出しと rename で行い、途中で失敗しても既存値を壊さない。
pub struct FileKeyValueStore {
    dir: PathBuf,
    event_bus: Option<Arc<TableEventBus>>,
}

impl FileKeyValueStore {
    /// ディレクトリがなければ作成してストアを開く。
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            event_bus: None,
        })
    }

    pub fn with_event_bus(mut self, event_bus: Arc<TableEventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }

    fn notify(&self, key: &str) {
        if let Some(bus) = &self.event_bus {
            bus.publish(TableEvent::StorageChanged {
                key: key.to_string(),
            });
        }
    }
}

/// キーをファイル名に使える形へエンコードする。英数字と - _ . 以外は %XX に置き換える。
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        self.notify(key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                self.notify(key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
