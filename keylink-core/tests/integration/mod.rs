// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration Tests for Keylink Core
//!
//! These tests verify complete workflows from first run through linking a
//! second device and wiping.
//!
//! Run with: cargo test --test integration

mod device_link_workflow_test;
mod first_run_workflow_test;
