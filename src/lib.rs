//! fmrmatch decodes ISO/IEC 19794-2:2005 finger minutiae records and scores
//! them against each other.
//!
//! The pipeline is: [`decode`] a record, compare two records with
//! [`TemplateMatcher`], or search a whole gallery with [`GallerySearch`].
//! Scores are integers on a 0..=255 scale; a template compared with itself
//! scores 255. Gallery scans can run on rayon with the `rayon` feature, and
//! spans/events are emitted through `tracing` with the `tracing` feature.

pub mod compare;
pub mod lowlevel;
pub mod matcher;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use compare::{Alignment, ComparatorParams};
pub use matcher::{
    MatchOutcome, ScoreBand, TemplateMatcher, Threshold, MAX_SCORE, MAX_VIEW_MINUTIAE,
    MAX_VIEW_PAIRS,
};
pub use search::{
    score_percentage, BestCandidate, GalleryRecord, GallerySearch, MatchReport,
    RankedCandidate, SearchConfig, Verification,
};
pub use template::{
    decode, decode_base64, DecodedTemplate, FingerPosition, FingerView, Minutia, MinutiaKind,
    TemplateBuilder, TemplateHeader, MAX_VIEWS,
};
pub use util::{ConfigError, FormatError, FormatResult, SearchError, SearchResult};
