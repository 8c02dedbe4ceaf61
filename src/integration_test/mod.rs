#![cfg(test)]
// Suppress 'unused' warnings for the testsuite
#![allow(unused)]

mod network_test;
mod test_utils;
