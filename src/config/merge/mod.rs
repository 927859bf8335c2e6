pub mod merge_policy;
