use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::error;
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    document_root: String,
    port: u16,
    #[serde(default)]
    workers: usize,
    #[serde(default = "default_local")]
    local: bool,
}

fn default_local() -> bool {
    true
}

impl Config {
    pub fn new() -> Self {
        Self {
            document_root: "static".to_string(),
            port: 7878,
            workers: 0,
            local: true,
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut str_val = String::new();
        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("Error Reading file: {}", e),
        };

        let mut raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置");
                Config::new()
            }
        };
        if raw_config.workers == 0 {
            raw_config.workers = num_cpus::get();
        }
        raw_config
    }
}

impl Config {
    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn local(&self) -> bool {
        self.local
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
