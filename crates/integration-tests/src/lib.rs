//! End-to-end chat cycles against an in-process mock backend. See `tests/`.
