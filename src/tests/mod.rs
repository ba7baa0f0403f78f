// src/tests/mod.rs
