/// One typed unit of a route pattern.
///
/// Segments are immutable and only created by [`parse`](super::parse). The
/// matcher ranks segment kinds in the declaration order of this enum: a
/// literal is more specific than a parameter, which is more specific than a
/// required rest, which is more specific than an optional rest. `Group` is
/// zero-width and never participates in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Exact path component, already unescaped.
    Literal { value: String },
    /// Matches exactly one non-empty path component and binds it.
    Param { name: String },
    /// Matches zero or one path component; binds only when one is present.
    OptionalParam { name: String },
    /// Matches one or more trailing components, binding the joined remainder.
    RequiredRest { name: String },
    /// Matches zero or more trailing components; binds only a non-empty
    /// remainder.
    OptionalRest { name: String },
    /// Zero-width grouping marker. Part of the pattern's identity and display
    /// form, invisible to the matcher.
    Group { name: String },
}

impl Segment {
    /// Whether this segment consumes a trailing remainder.
    #[must_use]
    pub fn is_rest(&self) -> bool {
        matches!(self, Segment::RequiredRest { .. } | Segment::OptionalRest { .. })
    }

    /// Whether this segment may match zero components.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Segment::OptionalParam { .. } | Segment::OptionalRest { .. })
    }

    /// Whether this segment is a zero-width group marker.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Segment::Group { .. })
    }

    /// Name bound by this segment, if it binds one.
    #[must_use]
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Segment::Param { name }
            | Segment::OptionalParam { name }
            | Segment::RequiredRest { name }
            | Segment::OptionalRest { name } => Some(name),
            Segment::Literal { .. } | Segment::Group { .. } => None,
        }
    }
}
