// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Identity Module
//!
//! Per-install device identity.

pub mod device;

pub use device::{
    DeviceId, DeviceIdentity, PlatformAttributes, PlatformIdentity, StaticPlatformIdentity,
};
