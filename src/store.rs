//! Persistent run configuration: a little-endian magic word followed by the bincode body.

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use transport::RunConfig;

pub const CONFIG_MAGIC: u16 = 0x5243;

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored configuration. A missing or unreadable blob is replaced by the defaults.
    pub fn load(&self) -> Result<RunConfig> {
        if let Some(config) = self.read()? {
            return Ok(config);
        }

        println!("No configuration found. Setting defaults");
        let config = RunConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    fn read(&self) -> Result<Option<RunConfig>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("unable to open {}", self.path.display())),
        };
        let mut reader = BufReader::new(file);

        match reader.read_u16::<LittleEndian>() {
            Ok(CONFIG_MAGIC) => {}
            Ok(magic) => {
                log::warn!("bad magic {magic:#06x} in {}", self.path.display());
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                log::warn!("corrupt configuration in {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, config: &RunConfig) -> Result<()> {
        let file = File::create(&self.path).with_context(|| format!("unable to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_u16::<LittleEndian>(CONFIG_MAGIC)?;
        bincode::serde::encode_into_std_write(config, &mut writer, bincode::config::standard())?;
        writer.flush()?;
        Ok(())
    }
}
