//! Tests for the access checker and lifecycle manager.
//!
//! Organized by functionality:
//! - Wildcard, direct and implied relations
//! - Group transitivity and blocks
//! - Organization scope and owner shortcut
//! - Linked resources
//! - Anonymous trust-center visitors
//! - Fail-closed behaviour


mod checker_tests;
