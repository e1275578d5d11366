//! Integration tests for Quota Console
//!
//! These tests drive the backend client and workflows against a wiremock
//! server or the in-memory mock backend.

mod enterprise_tests;
mod membership_tests;
mod quota_query_tests;
