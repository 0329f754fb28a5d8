//! Statutory Deduction Engine for Indian Payroll
//!
//! This crate computes the statutory deductions on an employee's monthly pay:
//! income tax deducted at source (TDS), provident fund (PF), employees' state
//! insurance (ESI), professional tax (PT) and labour welfare fund (LWF),
//! against a versioned, validated configuration snapshot.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod run;
