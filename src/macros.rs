// Like `unreachable!` in debug builds; in release builds tells the optimizer the branch is dead
macro_rules! assume_unreachable {
    () => {
        if cfg!(debug_assertions) {
            unreachable!()
        } else {
            core::hint::unreachable_unchecked()
        }
    };
}
