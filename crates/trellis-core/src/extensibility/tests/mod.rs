pub mod resolver_tests;
pub mod search_rules_tests;
pub mod preprocessor_tests;
pub mod cache_tests;
