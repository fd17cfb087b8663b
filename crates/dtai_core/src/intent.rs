//! crates/dtai_core/src/intent.rs
//!
//! Pure keyword/regex classification of free-text assistant messages.
//!
//! `classify` is total and deterministic: the same text always produces the
//! same `Intent`, unmatched axes stay `None`, and nothing here performs I/O.
//! Each axis is an ordered table of (keyword class, variant) pairs evaluated
//! first-match-wins, so tests can enumerate (input, expected) pairs without
//! touching control flow.

use regex::Regex;
use std::sync::LazyLock;

/// Who a message is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Teacher,
    Student,
    Group,
    Program,
    Staff,
}

/// Ranking direction requested by the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Best,
    Worst,
    Most,
    Least,
}

/// Verb-like hint, detected independently of the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Compare,
    List,
    Find,
}

/// Institution track, discriminated by program duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Tsu,
    Engineering,
}

impl Track {
    /// Program length in terms for this track.
    pub fn duration_terms(&self) -> i32 {
        match self {
            Track::Tsu => 6,
            Track::Engineering => 9,
        }
    }
}

/// A filter dimension narrowing a dispatcher query. Only one scope survives
/// classification; later patterns overwrite earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Track(Track),
    Term(u32),
    Group(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Track(Track::Tsu) => f.write_str("tsu"),
            Scope::Track(Track::Engineering) => f.write_str("ingenieria"),
            Scope::Term(n) => write!(f, "cuatrimestre_{n}"),
            Scope::Group(code) => write!(f, "grupo_{code}"),
        }
    }
}

/// Top-level intent category, independent of subject detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Greeting,
    Help,
    Statistics,
    Comparison,
}

/// The structured result of classifying one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub subject: Option<Subject>,
    pub qualifier: Option<Qualifier>,
    pub action: Option<Action>,
    pub scope: Option<Scope>,
    pub category: Option<Category>,
}

//=========================================================================================
// Keyword classes
//=========================================================================================

fn keyword_class(words: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\b", words.join("|"))).expect("keyword class pattern")
}

static SUBJECT_CLASSES: LazyLock<Vec<(Regex, Subject)>> = LazyLock::new(|| {
    vec![
        (
            keyword_class(&[
                "profesor",
                "profesores",
                "docente",
                "docentes",
                "maestro",
                "maestros",
                "tutor",
                "tutores",
            ]),
            Subject::Teacher,
        ),
        (
            keyword_class(&[
                "estudiante",
                "estudiantes",
                "alumno",
                "alumnos",
                "matricula",
                "matrícula",
            ]),
            Subject::Student,
        ),
        (
            keyword_class(&["grupo", "grupos", "salon", "salón", "clase", "clases"]),
            Subject::Group,
        ),
        (
            keyword_class(&[
                "carrera",
                "carreras",
                "programa",
                "programas",
                "licenciatura",
            ]),
            Subject::Program,
        ),
        (
            keyword_class(&["directivo", "directivos", "director", "coordinador"]),
            Subject::Staff,
        ),
    ]
});

static QUALIFIER_CLASSES: LazyLock<Vec<(Regex, Qualifier)>> = LazyLock::new(|| {
    vec![
        (
            keyword_class(&[
                "mejor",
                "mejores",
                "bueno",
                "buenos",
                "excelente",
                "sobresaliente",
                "destacado",
                "top",
                "primero",
            ]),
            Qualifier::Best,
        ),
        (
            keyword_class(&[
                "peor",
                "peores",
                "malo",
                "malos",
                "bajo",
                "reprobado",
                "reprobados",
                "último",
            ]),
            Qualifier::Worst,
        ),
        (
            keyword_class(&["más", "mayor", "máximo", "superior"]),
            Qualifier::Most,
        ),
        (
            keyword_class(&["menos", "menor", "mínimo", "inferior"]),
            Qualifier::Least,
        ),
    ]
});

static ACTION_CLASSES: LazyLock<Vec<(Regex, Action)>> = LazyLock::new(|| {
    vec![
        (
            keyword_class(&["comparar", "versus", "vs", "diferencia", "entre"]),
            Action::Compare,
        ),
        (
            keyword_class(&["listar", "mostrar", "dame", "ver", "todos"]),
            Action::List,
        ),
        (
            keyword_class(&["buscar", "encontrar", "quién", "quien", "cuál", "cual"]),
            Action::Find,
        ),
    ]
});

static CATEGORY_CLASSES: LazyLock<Vec<(Regex, Category)>> = LazyLock::new(|| {
    vec![
        (
            keyword_class(&["hola", "hello", "hey", "buenas", "saludos"]),
            Category::Greeting,
        ),
        (
            keyword_class(&["ayuda", "help", "que puedes", "qué puedes", "capacidades"]),
            Category::Help,
        ),
        (
            keyword_class(&[
                "estadística",
                "estadísticas",
                "resumen",
                "total",
                "cantidad",
            ]),
            Category::Statistics,
        ),
        (
            keyword_class(&["comparar", "versus", "diferencia"]),
            Category::Comparison,
        ),
    ]
});

static TRACK_CLASSES: LazyLock<Vec<(Regex, Track)>> = LazyLock::new(|| {
    vec![
        (keyword_class(&["tsu", "técnico superior"]), Track::Tsu),
        (
            keyword_class(&["ingeniería", "ingenieria", "ing"]),
            Track::Engineering,
        ),
    ]
});

static TERM_SCOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:cuatrimestre|cuatri)\s*(\d+)\b").expect("term scope pattern")
});

static GROUP_SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgrupo\s*([a-z0-9]+)\b").expect("group scope pattern"));

fn first_match<T: Copy>(classes: &[(Regex, T)], text: &str) -> Option<T> {
    classes
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, variant)| *variant)
}

/// Scope detection runs every pattern in fixed order; the last successful
/// pattern wins, so "grupo B del cuatrimestre 2" resolves to the group.
fn detect_scope(text: &str) -> Option<Scope> {
    let mut scope = first_match(&TRACK_CLASSES, text).map(Scope::Track);
    if let Some(caps) = TERM_SCOPE.captures(text) {
        if let Ok(n) = caps[1].parse::<u32>() {
            scope = Some(Scope::Term(n));
        }
    }
    if let Some(caps) = GROUP_SCOPE.captures(text) {
        scope = Some(Scope::Group(caps[1].to_uppercase()));
    }
    scope
}

/// Classifies one message. Lowercases and trims internally; never fails.
pub fn classify(message: &str) -> Intent {
    let text = message.trim().to_lowercase();
    Intent {
        subject: first_match(&SUBJECT_CLASSES, &text),
        qualifier: first_match(&QUALIFIER_CLASSES, &text),
        action: first_match(&ACTION_CLASSES, &text),
        scope: detect_scope(&text),
        category: first_match(&CATEGORY_CLASSES, &text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_keywords_win_over_later_classes() {
        // Subject classes are disjoint by priority: teacher > student.
        let intent = classify("compara al profesor con el alumno");
        assert_eq!(intent.subject, Some(Subject::Teacher));
    }

    #[test]
    fn teacher_synonyms_all_classify_as_teacher() {
        for msg in ["el docente", "los maestros", "un tutor", "profesores de aqui"] {
            assert_eq!(classify(msg).subject, Some(Subject::Teacher), "{msg}");
        }
    }

    #[test]
    fn subject_is_none_without_keywords() {
        assert_eq!(classify("xyzzy 42").subject, None);
    }

    #[test]
    fn term_scope_variants() {
        for msg in [
            "cuatrimestre 3",
            "cuatri 3",
            "CUATRIMESTRE 3",
            "el cuatrimestre3",
        ] {
            assert_eq!(
                classify(msg).scope.map(|s| s.to_string()),
                Some("cuatrimestre_3".to_string()),
                "{msg}"
            );
        }
    }

    #[test]
    fn group_scope_is_uppercased() {
        let intent = classify("promedio del grupo a1");
        assert_eq!(intent.scope, Some(Scope::Group("A1".to_string())));
        assert_eq!(intent.scope.unwrap().to_string(), "grupo_A1");
    }

    #[test]
    fn later_scope_pattern_overwrites_track() {
        // Track keyword matches first but the group pattern wins.
        let intent = classify("el mejor de tsu en el grupo b");
        assert_eq!(intent.scope, Some(Scope::Group("B".to_string())));
    }

    #[test]
    fn classification_is_idempotent() {
        let msg = "¿Cuál es el mejor profesor de TSU?";
        assert_eq!(classify(msg), classify(msg));
    }

    #[test]
    fn best_teacher_of_tsu() {
        let intent = classify("¿Cuál es el mejor profesor de TSU?");
        assert_eq!(intent.subject, Some(Subject::Teacher));
        assert_eq!(intent.qualifier, Some(Qualifier::Best));
        assert_eq!(intent.action, Some(Action::Find));
        assert_eq!(intent.scope, Some(Scope::Track(Track::Tsu)));
    }

    #[test]
    fn engineering_track_keyword() {
        let intent = classify("peores grupos de ingeniería");
        assert_eq!(intent.subject, Some(Subject::Group));
        assert_eq!(intent.qualifier, Some(Qualifier::Worst));
        assert_eq!(intent.scope, Some(Scope::Track(Track::Engineering)));
        assert_eq!(intent.scope.unwrap().to_string(), "ingenieria");
    }

    #[test]
    fn qualifier_priority_best_before_most() {
        // "mejor" and "más" both appear; best is the earlier class.
        let intent = classify("quién tiene el mejor promedio y más experiencia");
        assert_eq!(intent.qualifier, Some(Qualifier::Best));
    }

    #[test]
    fn accented_most_qualifier() {
        assert_eq!(
            classify("profesor con más experiencia").qualifier,
            Some(Qualifier::Most)
        );
    }

    #[test]
    fn greeting_category_coexists_with_subject() {
        let intent = classify("hola, dame los mejores profesores");
        assert_eq!(intent.category, Some(Category::Greeting));
        assert_eq!(intent.subject, Some(Subject::Teacher));
    }

    #[test]
    fn category_detection() {
        assert_eq!(classify("hola").category, Some(Category::Greeting));
        assert_eq!(classify("qué puedes hacer").category, Some(Category::Help));
        assert_eq!(
            classify("resumen general").category,
            Some(Category::Statistics)
        );
        assert_eq!(
            classify("versus el otro").category,
            Some(Category::Comparison)
        );
        assert_eq!(classify("nada reconocible aqui").category, None);
    }

    #[test]
    fn fully_unmatched_message_degrades_to_default() {
        let intent = classify("zzz qqq");
        assert_eq!(
            intent,
            Intent {
                subject: None,
                qualifier: None,
                action: None,
                scope: None,
                category: None,
            }
        );
    }
}
