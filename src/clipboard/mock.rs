use super::Clipboard;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockClipboard {
    name: &'static str,
    fail: bool,
    writes: Arc<Mutex<Vec<String>>>,
}

impl MockClipboard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail: false,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn get_writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for MockClipboard {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Clipboard(format!("{} unavailable", self.name)));
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
