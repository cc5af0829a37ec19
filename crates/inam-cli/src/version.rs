pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("INAM_GIT_COUNT"),
    ".",
    env!("INAM_GIT_SHA"),
    env!("INAM_GIT_DIRTY")
);
