#[derive(Debug, Clone, serde::Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_record_capacity")]
    pub record_capacity: u64,
    #[serde(default = "default_page_capacity")]
    pub page_capacity: u64,
}

fn default_record_capacity() -> u64 { 10_000 }
fn default_page_capacity() -> u64 { 1_000 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            record_capacity: default_record_capacity(),
            page_capacity: default_page_capacity(),
        }
    }
}
