/// Main test module that includes all sub-modules
/// Run specific tests with `cargo test <module>::<submodule>`
/// For example: `cargo test algorithm::assignment_test`
// Utility modules
pub mod utils;

// Data container and loader tests
pub mod data {
    pub mod copy_test;
    pub mod loader_test;
}

// Algorithm tests
pub mod algorithm {
    pub mod assignment_test;
    pub mod balance_test;
}

// End-to-end matching tests
pub mod integration {
    pub mod matching_test;
    pub mod session_test;
}
