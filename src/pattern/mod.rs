//! # Pattern Module
//!
//! The pattern module turns route pattern strings into ordered sequences of
//! typed [`Segment`]s and formats them back out in any of the supported
//! textual styles.
//!
//! ## Overview
//!
//! A pattern is a finite ordered sequence of segments. Parsing normalizes the
//! input first: consecutive slashes collapse, a trailing slash is stripped,
//! and both `""` and `"/"` yield the empty (root) sequence. A component with
//! a file extension (`events.json`) stays a single literal; dots never split
//! segments.
//!
//! ## Segment grammar
//!
//! | Bracket form    | Colon form | Dollar form | Segment                 |
//! |-----------------|------------|-------------|-------------------------|
//! | `users`         | `users`    | `users`     | `Literal`               |
//! | `[id]`          | `:id`      | `$id`       | `Param`                 |
//! | `[[id]]`        | `:id?`     | `$id?`      | `OptionalParam`         |
//! | `[...rest]`     | `:rest+`   | `$rest+`    | `RequiredRest`          |
//! | `[[...rest]]`   | `:rest*`   | `$rest*`    | `OptionalRest`          |
//! | `(section)`     | `(section)`| `(section)` | `Group` (zero-width)    |
//!
//! A bare `*` in colon style parses as `OptionalRest` named `rest`. Group
//! segments contribute to pattern identity and display but never to
//! matching. Conversion between styles is a pure function of the segment
//! sequence; `format(parse(s), PatternStyle::Bracket)` is the canonical form
//! and is identical for all syntactically-equivalent inputs.

mod format;
mod parser;
mod types;

pub use format::{canonical, format, PatternStyle};
pub use parser::parse;
pub(crate) use parser::validate_sequence;
pub use types::Segment;
