use std::fs::File;
use std::io::{BufReader, Read};
use crate::config::CacheConfig;
use crate::error::ReplayError;

/// Opens a trace file for replay
pub fn get_reader(file: File) -> Result<Box<dyn Read>, ReplayError> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        const BUFFER_SIZE: usize = 16 * 4096;
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
    // Memory map the file on unix systems, traces are read front to back exactly once
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        // Zero length mappings are rejected by the OS
        if file.metadata()?.len() == 0 {
            return Ok(Box::new(std::io::empty()));
        }
        // The mapping is only read, and the trace isn't expected to change while it is replayed
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(Box::new(Cursor::new(m)))
    }
}

/// Reads a JSON cache configuration
pub fn read_config(file: File) -> Result<CacheConfig, ReplayError> {
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
