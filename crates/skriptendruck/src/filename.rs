//! Parsing of the print-order naming convention
//! `<username>_<color>_<binding>[_<size>]_<sequence>.pdf`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::order::{BindingType, ColorMode};

/// Naming convention shown to users when a filename is rejected.
pub const NAMING_CONVENTION: &str = "username_color_binding[_size]_sequence.pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub username: String,
    pub color_mode: ColorMode,
    pub binding_type: BindingType,
    pub binding_size_mm: Option<u32>,
    pub sequence_number: u32,
}

impl ParsedFilename {
    /// Canonical filename for these fields. Parsing it yields `self` again.
    pub fn to_filename(&self) -> String {
        match self.binding_size_mm {
            Some(size) => format!(
                "{}_{}_{}_{}_{:03}.pdf",
                self.username,
                self.color_mode.token(),
                self.binding_type.token(),
                size,
                self.sequence_number
            ),
            None => format!(
                "{}_{}_{}_{:03}.pdf",
                self.username,
                self.color_mode.token(),
                self.binding_type.token(),
                self.sequence_number
            ),
        }
    }
}

static RE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<user>[a-z0-9]+)_(?P<color>[a-z]+)_(?P<binding>[a-z]+)(?:_(?P<size>[0-9]+))?_(?P<seq>[0-9]+)\.pdf$",
    )
    .unwrap()
});

pub fn parse_filename(filename: &str) -> Result<ParsedFilename, ParseError> {
    let invalid = |reason: String| ParseError::InvalidFilename {
        filename: filename.to_string(),
        reason,
    };

    let caps = RE_FILENAME.captures(filename).ok_or_else(|| {
        invalid(format!("expected format {}", NAMING_CONVENTION))
    })?;

    let color = &caps["color"];
    let color_mode =
        ColorMode::from_token(color).ok_or_else(|| invalid(format!("unknown color mode '{}'", color)))?;

    let binding = &caps["binding"];
    let binding_type = BindingType::from_token(binding)
        .ok_or_else(|| invalid(format!("unknown binding type '{}'", binding)))?;

    let binding_size_mm = match caps.name("size") {
        Some(size) if binding_type != BindingType::Ring => {
            return Err(invalid(format!(
                "binding size '{}' is only allowed with ring binding",
                size.as_str()
            )));
        }
        Some(size) => Some(
            size.as_str()
                .parse::<u32>()
                .map_err(|_| invalid(format!("binding size '{}' out of range", size.as_str())))?,
        ),
        None => None,
    };

    let sequence_number = caps["seq"]
        .parse::<u32>()
        .map_err(|_| invalid(format!("sequence number '{}' out of range", &caps["seq"])))?;

    Ok(ParsedFilename {
        username: caps["user"].to_ascii_lowercase(),
        color_mode,
        binding_type,
        binding_size_mm,
        sequence_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ring_with_size() {
        let parsed = parse_filename("ab12345_bw_ring_8_001.pdf").unwrap();
        assert_eq!(parsed.username, "ab12345");
        assert_eq!(parsed.color_mode, ColorMode::Bw);
        assert_eq!(parsed.binding_type, BindingType::Ring);
        assert_eq!(parsed.binding_size_mm, Some(8));
        assert_eq!(parsed.sequence_number, 1);
    }

    #[test]
    fn test_parse_legacy_tokens() {
        let parsed = parse_filename("xx99999_farbig_sh_001.pdf").unwrap();
        assert_eq!(parsed.color_mode, ColorMode::Color);
        assert_eq!(parsed.binding_type, BindingType::Folder);
        assert_eq!(parsed.binding_size_mm, None);

        let parsed = parse_filename("mm11111_sw_mb_3.pdf").unwrap();
        assert_eq!(parsed.color_mode, ColorMode::Bw);
        assert_eq!(parsed.binding_type, BindingType::Ring);
        assert_eq!(parsed.sequence_number, 3);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let parsed = parse_filename("AB12345_BW_None_002.PDF").unwrap();
        assert_eq!(parsed.username, "ab12345");
        assert_eq!(parsed.binding_type, BindingType::None);
    }

    #[test]
    fn test_size_rejected_without_ring() {
        let err = parse_filename("ab12345_bw_folder_8_001.pdf").unwrap_err();
        let ParseError::InvalidFilename { filename, reason } = err;
        assert_eq!(filename, "ab12345_bw_folder_8_001.pdf");
        assert!(reason.contains("ring"));
    }

    #[test]
    fn test_invalid_filenames() {
        for name in [
            "",
            "document.pdf",
            "ab12345_bw_none_001.docx",
            "ab12345_grey_none_001.pdf",
            "ab12345_bw_staple_001.pdf",
            "ab-12345_bw_none_001.pdf",
            "ab12345_bw_none_.pdf",
            "ab12345_bw_none_001.pdf.bak",
            "ab12345_bw_none_99999999999.pdf",
        ] {
            let result = parse_filename(name);
            assert!(result.is_err(), "expected '{}' to be rejected", name);
        }
    }

    #[test]
    fn test_error_echoes_filename() {
        let err = parse_filename("random.pdf").unwrap_err();
        assert!(err.to_string().contains("random.pdf"));
    }

    #[test]
    fn test_to_filename_round_trip() {
        for name in [
            "ab12345_bw_ring_8_001.pdf",
            "Xy77_Farbe_OB_42.pdf",
            "zz1_colour_mb_7.pdf",
            "q9_sw_sh_0.pdf",
        ] {
            let parsed = parse_filename(name).unwrap();
            let reparsed = parse_filename(&parsed.to_filename()).unwrap();
            assert_eq!(parsed, reparsed, "round trip failed for {}", name);
        }
    }
}
