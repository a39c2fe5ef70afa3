//! Scenario tests driving planning and submission against in-memory doubles
