mod locator_tests;
mod traversal_tests;
