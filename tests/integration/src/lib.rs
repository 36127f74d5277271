// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for hamjab-hub, exercised against the crate's public API
//! rather than its internals. See `tests/` for the actual test suites.
