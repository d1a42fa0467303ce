use std::fmt;

/// Position sentence types the parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// Fix data: position plus fix quality
    Gga,
    /// Recommended minimum: position plus active/void status
    Rmc,
}

impl SentenceKind {
    fn from_formatter(formatter: &str) -> Option<Self> {
        match formatter {
            "GGA" => Some(SentenceKind::Gga),
            "RMC" => Some(SentenceKind::Rmc),
            _ => None,
        }
    }

    /// Field indices of (latitude, N/S, longitude, E/W)
    fn position_fields(&self) -> (usize, usize, usize, usize) {
        match self {
            SentenceKind::Gga => (2, 3, 4, 5),
            SentenceKind::Rmc => (3, 4, 5, 6),
        }
    }
}

impl fmt::Display for SentenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentenceKind::Gga => f.write_str("GGA"),
            SentenceKind::Rmc => f.write_str("RMC"),
        }
    }
}

/// Fix quality reported alongside a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixQuality {
    Invalid,
    Gps,
    Differential,
    Other(u8),
}

impl FixQuality {
    fn from_gga(code: u8) -> Self {
        match code {
            0 => FixQuality::Invalid,
            1 => FixQuality::Gps,
            2 => FixQuality::Differential,
            other => FixQuality::Other(other),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, FixQuality::Invalid)
    }
}

impl fmt::Display for FixQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixQuality::Invalid => f.write_str("invalid"),
            FixQuality::Gps => f.write_str("gps"),
            FixQuality::Differential => f.write_str("dgps"),
            FixQuality::Other(code) => write!(f, "code {}", code),
        }
    }
}

/// One coordinate axis exactly as the receiver sent it
#[derive(Debug, Clone, PartialEq)]
pub struct RawAxis {
    pub value: String,
    pub hemisphere: char,
}

/// Position sentence after tokenizing, before coordinate conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFix {
    pub kind: SentenceKind,
    /// Two-letter talker id, e.g. `GP` or `GN`
    pub talker: String,
    pub latitude: Option<RawAxis>,
    pub longitude: Option<RawAxis>,
    pub quality: Option<FixQuality>,
}

impl ParsedFix {
    /// Receiver reports a usable fix (unknown quality counts as usable)
    pub fn has_valid_fix(&self) -> bool {
        self.quality.map_or(true, |q| q.is_valid())
    }
}

/// Errors that can occur while parsing a sentence
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidEncoding,
    InvalidFormat { details: String },
    UnsupportedSentence { sentence: String },
    MissingChecksum,
    ChecksumMismatch { expected: u8, actual: u8 },
    InsufficientFields { required: usize, available: usize },
    InvalidField { field: String, value: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidEncoding => write!(f, "Sentence is not valid UTF-8"),
            ParseError::InvalidFormat { details } => write!(f, "Invalid sentence format: {}", details),
            ParseError::UnsupportedSentence { sentence } => write!(f, "Unsupported sentence type: {}", sentence),
            ParseError::MissingChecksum => write!(f, "Sentence has no checksum"),
            ParseError::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {:02X}, got {:02X}", expected, actual)
            }
            ParseError::InsufficientFields { required, available } => {
                write!(f, "Insufficient fields: need {}, got {}", required, available)
            }
            ParseError::InvalidField { field, value } => write!(f, "Invalid {} field: '{}'", field, value),
        }
    }
}

impl std::error::Error for ParseError {}

/// NMEA 0183 parser for GGA and RMC position sentences
pub struct SentenceParser {
    supported_kinds: Vec<SentenceKind>,
    require_checksum: bool,
}

impl SentenceParser {
    /// Parser accepting GGA and RMC, checksum optional but verified when present
    pub fn new() -> Self {
        Self {
            supported_kinds: vec![SentenceKind::Gga, SentenceKind::Rmc],
            require_checksum: false,
        }
    }

    /// Create a parser with specific sentence support
    pub fn with_kinds(kinds: Vec<SentenceKind>) -> Self {
        Self {
            supported_kinds: kinds,
            require_checksum: false,
        }
    }

    /// Reject sentences that carry no `*hh` checksum
    pub fn set_require_checksum(&mut self, require: bool) {
        self.require_checksum = require;
    }

    /// Parse a raw line into a fix
    pub fn parse_bytes(&self, line: &[u8]) -> Result<ParsedFix, ParseError> {
        let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidEncoding)?;
        self.parse(text)
    }

    /// Parse one sentence, e.g. `$GPGGA,123519,4807.038,N,...*47`
    pub fn parse(&self, line: &str) -> Result<ParsedFix, ParseError> {
        let line = line.trim();
        let body = line.strip_prefix('$').ok_or_else(|| ParseError::InvalidFormat {
            details: "missing '$' start".to_string(),
        })?;

        let body = match body.split_once('*') {
            Some((body, checksum_field)) => {
                let expected = u8::from_str_radix(checksum_field.trim(), 16).map_err(|_| {
                    ParseError::InvalidField {
                        field: "checksum".to_string(),
                        value: checksum_field.to_string(),
                    }
                })?;
                let actual = Self::calculate_checksum(body);
                if expected != actual {
                    return Err(ParseError::ChecksumMismatch { expected, actual });
                }
                body
            }
            None if self.require_checksum => return Err(ParseError::MissingChecksum),
            None => body,
        };

        let fields: Vec<&str> = body.split(',').collect();
        let address = fields[0];
        if address.len() != 5 || !address.is_ascii() {
            return Err(ParseError::InvalidFormat {
                details: format!("bad address field '{}'", address),
            });
        }

        let (talker, formatter) = address.split_at(2);
        let kind = SentenceKind::from_formatter(formatter)
            .filter(|kind| self.supported_kinds.contains(kind))
            .ok_or_else(|| ParseError::UnsupportedSentence {
                sentence: address.to_string(),
            })?;

        const REQUIRED_FIELDS: usize = 7;
        if fields.len() < REQUIRED_FIELDS {
            return Err(ParseError::InsufficientFields {
                required: REQUIRED_FIELDS,
                available: fields.len(),
            });
        }

        let (lat, lat_dir, lon, lon_dir) = kind.position_fields();
        let latitude = Self::parse_axis(fields[lat], fields[lat_dir], "lat_dir")?;
        let longitude = Self::parse_axis(fields[lon], fields[lon_dir], "lon_dir")?;

        let quality = match kind {
            SentenceKind::Gga => Self::parse_gga_quality(fields[6])?,
            SentenceKind::Rmc => Self::parse_rmc_status(fields[2])?,
        };

        Ok(ParsedFix {
            kind,
            talker: talker.to_string(),
            latitude,
            longitude,
            quality,
        })
    }

    /// XOR of every byte between `$` and `*`
    pub fn calculate_checksum(body: &str) -> u8 {
        body.bytes().fold(0u8, |acc, b| acc ^ b)
    }

    fn parse_axis(value: &str, hemisphere: &str, field: &str) -> Result<Option<RawAxis>, ParseError> {
        if value.is_empty() || hemisphere.is_empty() {
            return Ok(None);
        }

        let mut chars = hemisphere.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Ok(Some(RawAxis {
                value: value.to_string(),
                hemisphere: letter,
            })),
            _ => Err(ParseError::InvalidField {
                field: field.to_string(),
                value: hemisphere.to_string(),
            }),
        }
    }

    fn parse_gga_quality(field: &str) -> Result<Option<FixQuality>, ParseError> {
        if field.is_empty() {
            return Ok(None);
        }
        field
            .parse::<u8>()
            .map(|code| Some(FixQuality::from_gga(code)))
            .map_err(|_| ParseError::InvalidField {
                field: "quality".to_string(),
                value: field.to_string(),
            })
    }

    fn parse_rmc_status(field: &str) -> Result<Option<FixQuality>, ParseError> {
        match field {
            "" => Ok(None),
            "A" => Ok(Some(FixQuality::Gps)),
            "V" => Ok(Some(FixQuality::Invalid)),
            other => Err(ParseError::InvalidField {
                field: "status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Default for SentenceParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn with_checksum(body: &str) -> String {
        format!("${}*{:02X}", body, SentenceParser::calculate_checksum(body))
    }

    #[test]
    fn test_parse_gga() {
        let parser = SentenceParser::new();
        let fix = parser.parse(GGA).unwrap();

        assert_eq!(fix.kind, SentenceKind::Gga);
        assert_eq!(fix.talker, "GP");
        assert_eq!(
            fix.latitude,
            Some(RawAxis { value: "4807.038".to_string(), hemisphere: 'N' })
        );
        assert_eq!(
            fix.longitude,
            Some(RawAxis { value: "01131.000".to_string(), hemisphere: 'E' })
        );
        assert_eq!(fix.quality, Some(FixQuality::Gps));
        assert!(fix.has_valid_fix());
    }

    #[test]
    fn test_parse_rmc() {
        let parser = SentenceParser::new();
        let fix = parser.parse(RMC).unwrap();

        assert_eq!(fix.kind, SentenceKind::Rmc);
        assert_eq!(fix.latitude.unwrap().value, "4807.038");
        assert_eq!(fix.longitude.unwrap().hemisphere, 'E');
        assert_eq!(fix.quality, Some(FixQuality::Gps));
    }

    #[test]
    fn test_parse_bytes_with_line_ending() {
        let parser = SentenceParser::new();
        let line = format!("{}\r\n", GGA);
        assert!(parser.parse_bytes(line.as_bytes()).is_ok());
        assert_eq!(
            parser.parse_bytes(&[b'$', 0xFF, 0xFE]),
            Err(ParseError::InvalidEncoding)
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let parser = SentenceParser::new();
        let corrupted = GGA.replace("*47", "*48");

        match parser.parse(&corrupted) {
            Err(ParseError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, 0x48);
                assert_eq!(actual, 0x47);
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_checksum() {
        let mut parser = SentenceParser::new();
        let bare = GGA.trim_end_matches("*47");
        assert!(parser.parse(bare).is_ok());

        parser.set_require_checksum(true);
        assert_eq!(parser.parse(bare), Err(ParseError::MissingChecksum));
    }

    #[test]
    fn test_no_fix_has_empty_axes() {
        let parser = SentenceParser::new();
        let line = with_checksum("GPGGA,123519,,,,,0,00,,,M,,M,,");
        let fix = parser.parse(&line).unwrap();

        assert!(fix.latitude.is_none());
        assert!(fix.longitude.is_none());
        assert_eq!(fix.quality, Some(FixQuality::Invalid));
        assert!(!fix.has_valid_fix());

        let void = with_checksum("GPRMC,123519,V,,,,,,,230394,,");
        assert_eq!(parser.parse(&void).unwrap().quality, Some(FixQuality::Invalid));
    }

    #[test]
    fn test_rejects_malformed_input() {
        let parser = SentenceParser::new();

        assert!(matches!(parser.parse(""), Err(ParseError::InvalidFormat { .. })));
        assert!(matches!(parser.parse("GPGGA,1,2"), Err(ParseError::InvalidFormat { .. })));
        assert!(matches!(parser.parse("$GP"), Err(ParseError::InvalidFormat { .. })));
        assert!(matches!(
            parser.parse("$GPGGA,123519,4807.038*ZZ"),
            Err(ParseError::InvalidField { .. })
        ));
        assert!(matches!(
            parser.parse(&with_checksum("GPGGA,123519,4807.038")),
            Err(ParseError::InsufficientFields { .. })
        ));
        assert!(matches!(
            parser.parse(&with_checksum("GPGGA,123519,4807.038,NS,01131.000,E,1")),
            Err(ParseError::InvalidField { .. })
        ));
        assert!(matches!(
            parser.parse(&with_checksum("GPGGA,123519,4807.038,N,01131.000,E,x")),
            Err(ParseError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_unsupported_sentence() {
        let parser = SentenceParser::new();
        let gsv = with_checksum("GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00");
        assert!(matches!(
            parser.parse(&gsv),
            Err(ParseError::UnsupportedSentence { .. })
        ));

        let gga_only = SentenceParser::with_kinds(vec![SentenceKind::Gga]);
        assert!(matches!(
            gga_only.parse(RMC),
            Err(ParseError::UnsupportedSentence { .. })
        ));
    }

    #[test]
    fn test_non_ascii_address_does_not_panic() {
        let parser = SentenceParser::new();
        assert!(parser.parse("$GPGG\u{e9},1,2,3,4,5,6").is_err());
    }
}
