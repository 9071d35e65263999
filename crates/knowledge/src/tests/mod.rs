//! Cross-module tests over real (generated) PDF files.
