/// Languages feedback can be given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Nl,
}

/// Feedback texts shown to students.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Text {
    ComparingDrawings,
    PixelDifference { differing: u64 },
    DrawingsDiffer { differing: u64, allowed: u64 },
    CompilationFailed { errors: usize },
    RuntimeFailed,
    TimeLimit,
    MemoryLimit,
    OutputLimit,
    PrintedOutput,
    SolutionFailed,
    InvalidConfiguration,
}

#[derive(Debug, Clone, Copy)]
pub struct Translator {
    language: Language,
}

impl Translator {
    /// Unknown languages fall back to English.
    pub fn new(natural_language: &str) -> Self {
        let language = match natural_language.trim().to_ascii_lowercase().as_str() {
            "nl" => Language::Nl,
            _ => Language::En,
        };
        Translator { language }
    }

    pub fn translate(&self, text: Text) -> String {
        match (self.language, text) {
            (Language::En, Text::ComparingDrawings) => "Comparing PNGs".into(),
            (Language::Nl, Text::ComparingDrawings) => "PNG's vergelijken".into(),

            (Language::En, Text::PixelDifference { differing }) => {
                format!(
                    "{} {} from the expected drawing",
                    differing,
                    if differing == 1 { "pixel differs" } else { "pixels differ" }
                )
            }
            (Language::Nl, Text::PixelDifference { differing }) => {
                format!(
                    "{} {} van de verwachte tekening",
                    differing,
                    if differing == 1 { "pixel verschilt" } else { "pixels verschillen" }
                )
            }

            (Language::En, Text::DrawingsDiffer { differing, allowed }) => format!(
                "Your drawing differs from the expected drawing in {} {} (at most {} allowed).",
                differing,
                pixels_en(differing),
                allowed
            ),
            (Language::Nl, Text::DrawingsDiffer { differing, allowed }) => format!(
                "Je tekening verschilt in {} pixel{} van de verwachte tekening (maximaal {} toegestaan).",
                differing,
                if differing == 1 { "" } else { "s" },
                allowed
            ),

            (Language::En, Text::CompilationFailed { errors }) => format!(
                "Your program could not be parsed ({} error{}).",
                errors,
                if errors == 1 { "" } else { "s" }
            ),
            (Language::Nl, Text::CompilationFailed { errors }) => format!(
                "Je programma kon niet ingelezen worden ({} fout{}).",
                errors,
                if errors == 1 { "" } else { "en" }
            ),

            (Language::En, Text::RuntimeFailed) => "Your program stopped with an error.".into(),
            (Language::Nl, Text::RuntimeFailed) => "Je programma stopte met een fout.".into(),

            (Language::En, Text::TimeLimit) => {
                "Your program ran too long; check for endless loops or recursion.".into()
            }
            (Language::Nl, Text::TimeLimit) => {
                "Je programma liep te lang; controleer op oneindige lussen of recursie.".into()
            }

            (Language::En, Text::MemoryLimit) => "Your program drew too many lines.".into(),
            (Language::Nl, Text::MemoryLimit) => "Je programma tekende te veel lijnen.".into(),

            (Language::En, Text::OutputLimit) => "Your program printed too much output.".into(),
            (Language::Nl, Text::OutputLimit) => "Je programma schreef te veel uitvoer.".into(),

            (Language::En, Text::PrintedOutput) => "Your program printed:".into(),
            (Language::Nl, Text::PrintedOutput) => "Je programma schreef:".into(),

            (Language::En, Text::SolutionFailed) => {
                "The model solution of this exercise could not be drawn.".into()
            }
            (Language::Nl, Text::SolutionFailed) => {
                "De modeloplossing van deze oefening kon niet getekend worden.".into()
            }

            (Language::En, Text::InvalidConfiguration) => {
                "This exercise is not configured correctly.".into()
            }
            (Language::Nl, Text::InvalidConfiguration) => {
                "Deze oefening is niet correct geconfigureerd.".into()
            }
        }
    }
}

impl Default for Translator {
    fn default() -> Self {
        Translator {
            language: Language::En,
        }
    }
}

fn pixels_en(count: u64) -> &'static str {
    if count == 1 { "pixel" } else { "pixels" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_languages_fall_back_to_english() {
        assert_eq!(Translator::new("NL").language, Language::Nl);
        assert_eq!(Translator::new("fr").language, Language::En);
        assert_eq!(Translator::new("").language, Language::En);
    }

    #[test]
    fn plurals() {
        let en = Translator::new("en");
        assert_eq!(
            en.translate(Text::PixelDifference { differing: 1 }),
            "1 pixel differs from the expected drawing"
        );
        assert_eq!(
            en.translate(Text::PixelDifference { differing: 0 }),
            "0 pixels differ from the expected drawing"
        );
        let nl = Translator::new("nl");
        assert_eq!(
            nl.translate(Text::CompilationFailed { errors: 2 }),
            "Je programma kon niet ingelezen worden (2 fouten)."
        );
    }

    #[test]
    fn tab_title() {
        assert_eq!(Translator::new("en").translate(Text::ComparingDrawings), "Comparing PNGs");
        assert_eq!(Translator::new("nl").translate(Text::ComparingDrawings), "PNG's vergelijken");
    }
}
