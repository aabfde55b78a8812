pub mod diploma;
