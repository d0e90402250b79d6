use syn::{Path, PathSegment};

pub fn last_segment(path: &Path) -> &PathSegment {
    path.segments.last().expect("expected path segments")
}
