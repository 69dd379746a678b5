//! Publish options.
//!
//! `PubOpts` is the behavioral bitmask handed to the publisher at start-up.
//! The bit values are stable; hosts pass them through from configuration.

use bitflags::bitflags;

bitflags! {
    /// Behavioral switches for one publisher.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PubOpts: u32 {
        /// Include the location backtrace in rendered errors.
        const DEBUG = 0x1;
        /// Bracket every published file with `START`/`END` comments.
        const IINFO = 0x2;
        /// Log every file publish.
        const VERBOSE = 0x4;
        /// Highlight in-place errors with visible HTML.
        const VISERR = 0x8;
        /// Collapse runs of whitespace in literal text.
        const WSS = 0x10;
        /// Emit literal text only; evaluate nothing.
        const NOPARSE = 0x20;
        /// Skip the localizer.
        const NOLOCALE = 0x40;
        /// `run_cfg` copies the collected globals into the universals.
        const COPY_CONF = 0x80;
        const OUTPUT_ERR_IN_PLACE = 0x100;
        const OUTPUT_ERR_PLACEHOLDERS = 0x200;
        const OUTPUT_ERR_COMMENTS = 0x400;
        /// Do not log errors.
        const OUTPUT_ERR_NOLOG = 0x800;
    }
}

/// How an error reaches the output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMode {
    /// The message itself, where the error happened.
    InPlace,
    /// A fixed marker where the error happened.
    Placeholder,
    /// An HTML comment holding the message.
    Comment,
    /// Nothing.
    Silent,
}

impl PubOpts {
    /// Error rendering selected by these options.
    ///
    /// When several modes are set the most visible one wins.
    pub fn error_mode(self) -> ErrorMode {
        if self.contains(PubOpts::OUTPUT_ERR_IN_PLACE) {
            ErrorMode::InPlace
        } else if self.contains(PubOpts::OUTPUT_ERR_PLACEHOLDERS) {
            ErrorMode::Placeholder
        } else if self.contains(PubOpts::OUTPUT_ERR_COMMENTS) {
            ErrorMode::Comment
        } else {
            ErrorMode::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_stable() {
        assert_eq!(PubOpts::WSS.bits(), 0x10);
        assert_eq!(PubOpts::OUTPUT_ERR_NOLOG.bits(), 0x800);
        assert_eq!(PubOpts::from_bits(0x1 | 0x8), Some(PubOpts::DEBUG | PubOpts::VISERR));
    }

    #[test]
    fn test_error_mode_precedence() {
        assert_eq!(PubOpts::empty().error_mode(), ErrorMode::Silent);
        assert_eq!(PubOpts::OUTPUT_ERR_COMMENTS.error_mode(), ErrorMode::Comment);
        assert_eq!(
            (PubOpts::OUTPUT_ERR_COMMENTS | PubOpts::OUTPUT_ERR_PLACEHOLDERS).error_mode(),
            ErrorMode::Placeholder
        );
        assert_eq!(
            (PubOpts::OUTPUT_ERR_IN_PLACE | PubOpts::OUTPUT_ERR_COMMENTS).error_mode(),
            ErrorMode::InPlace
        );
    }
}
