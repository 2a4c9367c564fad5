pub mod fake_page;

mod collector_tests;
