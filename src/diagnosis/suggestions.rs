//! Advisory text for each diagnosed condition state.
//!
//! A pure lookup keyed by state label. Labels outside the lookup fall back
//! to a fixed string rather than failing the diagnosis.

/// Returned for any state label without an advisory entry.
pub const FALLBACK_SUGGESTION: &str = "No se ha podido determinar una sugerencia clara.";

/// Advisory string for a final aggregated state label.
pub fn suggestion_for(state: &str) -> &'static str {
    match state {
        "ruptura" => {
            "¡ALERTA MÁXIMA! La pieza presenta rupturas, pudo haber sido causado por \
             impactos de sólidos o sobrepresión; reemplace el impulsor e investigue \
             la causa raíz en el sistema."
        }
        "corrosion" => {
            "Atención: La pieza presenta corrosión, pudo haber sido causada por ataque \
             químico del fluido; reemplace por un material compatible y analice el \
             fluido. La corrosión puede comprometer la integridad estructural."
        }
        "desgaste" => {
            "La pieza muestra desgaste, pudo haber sido por abrasión de partículas o \
             por cavitación; reemplace y corrija el sistema (filtrado o condiciones \
             de succión)."
        }
        "optimo" => "Condición ideal. La pieza está en perfecto estado.",
        _ => FALLBACK_SUGGESTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_state_has_an_entry() {
        for state in ["optimo", "desgaste", "corrosion", "ruptura"] {
            assert_ne!(suggestion_for(state), FALLBACK_SUGGESTION, "{state}");
        }
    }

    #[test]
    fn test_unknown_state_falls_back() {
        assert_eq!(suggestion_for("oxidado"), FALLBACK_SUGGESTION);
        assert_eq!(suggestion_for(""), FALLBACK_SUGGESTION);
    }

    #[test]
    fn test_most_severe_state_is_flagged_as_alert() {
        assert!(suggestion_for("ruptura").starts_with("¡ALERTA"));
    }
}
