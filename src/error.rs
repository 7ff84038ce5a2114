//! # Error Types
//!
//! This module defines the error type shared by the whole crate.
//!
//! Only the operations that read external data can fail: loading a save file,
//! loading a settings file and parsing a pitch name. Interactive edits (pitch
//! drags, setters) clamp instead of failing, and output failures are logged
//! by the staff rather than surfaced.
//!
//! ## Usage
//! ```rust
//! use recital::{Ledger, RecitalError};
//!
//! match Ledger::deserialize("25,32\n25,x\n") {
//!     Ok(ledger) => println!("{} notes", ledger.len()),
//!     Err(RecitalError::CorruptLedger { line, message }) => {
//!         eprintln!("save file broken at line {}: {}", line, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecitalError {
    /// A save file line could not be read back.
    ///
    /// Loading stops at the first bad line; nothing from a corrupt file is kept.
    ///
    /// # Example
    /// ```
    /// # use recital::RecitalError;
    /// let err = RecitalError::CorruptLedger {
    ///     line: 3,
    ///     message: "expected 2 fields, found 1".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Corrupt save file at line 3: expected 2 fields, found 1");
    /// ```
    #[error("Corrupt save file at line {line}: {message}")]
    CorruptLedger { line: usize, message: String },

    /// Invalid settings file.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A pitch name such as `C#4` could not be parsed or is off the keyboard.
    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
