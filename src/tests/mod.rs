//! Scenario tests driving the full mint flow against `MockLedger`

mod mint_flow_tests;
mod template_conformance_tests;
