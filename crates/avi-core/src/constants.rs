//! Constantes del motor core.
//!
//! `ENGINE_VERSION` entra en el cálculo de fingerprints: cambiarla invalida
//! los fingerprints previos aunque la definición y los datos no cambien.

/// Versión lógica del motor. Mantener estable mientras no haya cambios
/// incompatibles en el modelo de eventos o en el hashing.
pub const ENGINE_VERSION: &str = "AVI1.0";
