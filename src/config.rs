use crate::xmlrpc::decoder::DEFAULT_CHUNK_SIZE;

pub struct Config {
    pub url: Option<String>,
    pub chunk_size: usize,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            url: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose: false,
        }
    }
}
