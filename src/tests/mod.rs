//! Cross-module tests driving the HTTP API through a whole session lifecycle.
