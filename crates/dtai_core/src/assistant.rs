//! crates/dtai_core/src/assistant.rs
//!
//! The response dispatcher of the staff assistant: routes a classified
//! intent to a query strategy and formats the rows into a Spanish reply.
//!
//! Every subject handler isolates its own query failures and answers with a
//! conversational, example-filled fallback instead of propagating, so a
//! backend fault never breaks the conversation.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Datelike;
use rand::Rng;

use crate::domain::AccessLevel;
use crate::intent::{classify, Category, Intent, Qualifier, Scope, Subject, Track};
use crate::ports::AnalyticsService;

const GREETINGS: [&str; 3] = [
    "¡Hola! 👋 Soy tu asistente inteligente de DTAI. Puedo ayudarte con consultas muy específicas sobre estudiantes, profesores, grupos y todo lo relacionado con la división.",
    "¡Hey! 🤖 ¿Qué tal? Estoy aquí para responder cualquier pregunta específica que tengas sobre DTAI. Desde \"¿cuál es el mejor profesor?\" hasta \"¿qué estudiante necesita más apoyo?\".",
    "¡Buenas! 😊 Soy como tu asistente personal para datos de DTAI. Puedo ser muy específico y conversacional. ¿Qué te gustaría saber?",
];

const GREETING_HINT: &str = "\n\n💡 **Ejemplos de lo que puedo hacer:**\n\
• \"¿Cuál es el mejor profesor de matemáticas?\"\n\
• \"Estudiante más reprobado del cuatrimestre 2\"\n\
• \"¿Qué grupo de TSU tiene mejor promedio?\"\n\
• \"Compara el rendimiento entre carreras\"\n\
• \"¿Quién necesita apoyo académico?\"\n\n\
¡Pregúntame como si fuera una conversación normal! 🚀";

const HELP_REPLY: &str = "🤖 **¡Soy tu asistente conversacional de DTAI!**\n\n\
Puedo entender y responder preguntas naturales como si fuera una persona. No necesitas comandos específicos.\n\n\
🎯 **EJEMPLOS DE CONSULTAS ESPECÍFICAS:**\n\n\
**Sobre profesores:**\n\
• \"¿Cuál es el mejor profesor de la carrera?\"\n\
• \"Profesor con más experiencia en TSU\"\n\
• \"¿Qué docente tiene mejor rendimiento?\"\n\
• \"Profesor que necesita apoyo\"\n\n\
**Sobre estudiantes:**\n\
• \"¿Cuál es el alumno más reprobado del cuatrimestre 2?\"\n\
• \"Mejor estudiante del grupo A\"\n\
• \"¿Quién tiene el promedio más alto?\"\n\
• \"Estudiantes en riesgo académico\"\n\n\
**Sobre grupos:**\n\
• \"¿Qué grupo tiene mejor rendimiento?\"\n\
• \"Grupo con más problemas en TSU\"\n\
• \"¿Cuál es el mejor grupo del cuatrimestre 3?\"\n\n\
**Comparaciones:**\n\
• \"Compara TSU vs Ingeniería\"\n\
• \"¿Qué carrera tiene mejor promedio?\"\n\
• \"Diferencias entre grupos\"\n\n\
💬 **SOY CONVERSACIONAL:**\n\
Habla conmigo como hablarías con una persona. Entiendo contexto, sinónimos y puedo ser muy específico con los datos.\n\n\
¿Qué información específica necesitas? 🚀";

const NO_MATCH_REPLY_TAIL: &str = "Pero puedo ayudarte con consultas como:\n\n\
🎯 **Consultas específicas:**\n\
• \"¿Cuál es el mejor profesor de [materia]?\"\n\
• \"Estudiante más reprobado del cuatrimestre [número]\"\n\
• \"¿Qué grupo tiene mejor promedio en TSU?\"\n\
• \"Compara el rendimiento entre carreras\"\n\n\
🔍 **O búsquedas por nombre:**\n\
• Menciona nombres de estudiantes, profesores o grupos\n\
• Pregunta sobre carreras específicas\n\
• Solicita análisis de rendimiento\n\n\
¿Podrías ser más específico? Estoy aquí para ayudarte con datos muy detallados. 😊";

/// Position marker for ranked rows: medals for the podium, but only when the
/// caller asked for the best; otherwise plain ordinals.
fn position_marker(index: usize, qualifier: Option<Qualifier>) -> String {
    if qualifier == Some(Qualifier::Best) {
        match index {
            0 => return "🥇".to_string(),
            1 => return "🥈".to_string(),
            2 => return "🥉".to_string(),
            _ => {}
        }
    }
    format!("{}.", index + 1)
}

fn avg(value: Option<f64>) -> String {
    format!("{:.2}", value.unwrap_or(0.0))
}

fn access_level_label(level: AccessLevel) -> &'static str {
    match level {
        AccessLevel::Director => "director",
        AccessLevel::DeputyDirector => "subdirector",
        AccessLevel::Coordinator => "coordinador",
    }
}

/// The staff assistant. Classifies a message and dispatches it to one of the
/// aggregate query strategies behind the [`AnalyticsService`] port.
pub struct Assistant {
    analytics: Arc<dyn AnalyticsService>,
}

impl Assistant {
    pub fn new(analytics: Arc<dyn AnalyticsService>) -> Self {
        Self { analytics }
    }

    /// Produces the reply for one user message. Infallible: query faults are
    /// converted into conversational fallbacks inside each handler.
    pub async fn respond(&self, message: &str) -> String {
        let intent = classify(message);

        match intent.subject {
            Some(Subject::Teacher) => return self.teacher_reply(&intent, message).await,
            Some(Subject::Student) => return self.student_reply(&intent, message).await,
            Some(Subject::Group) => return self.group_reply(&intent, message).await,
            Some(Subject::Program) => return self.program_reply(&intent).await,
            Some(Subject::Staff) => return self.staff_reply().await,
            None => {}
        }

        match intent.category {
            Some(Category::Greeting) => greeting_reply(),
            Some(Category::Help) => HELP_REPLY.to_string(),
            Some(Category::Comparison) => self.comparison_reply().await,
            Some(Category::Statistics) => self.statistics_reply().await,
            None => self.search_reply(message).await,
        }
    }

    async fn teacher_reply(&self, intent: &Intent, message: &str) -> String {
        let rows = match self
            .analytics
            .teacher_rankings(intent.scope.as_ref(), intent.qualifier)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("teacher ranking query failed: {err}");
                return "Tuve un problema buscando información sobre profesores. ¿Podrías ser más específico?\n\n\
Ejemplos:\n\
• \"¿Cuál es el mejor profesor de matemáticas?\"\n\
• \"Profesor con más experiencia\"\n\
• \"¿Qué docente tiene mejor tasa de aprobación?\""
                    .to_string();
            }
        };

        if rows.is_empty() {
            return format!(
                "No encontré profesores que coincidan con tu búsqueda \"{message}\". 🤔\n\n\
¿Podrías intentar con:\n\
• \"¿Cuál es el mejor profesor de TSU?\"\n\
• \"Profesor con más experiencia en ingeniería\"\n\
• \"¿Qué docente tiene mejor rendimiento con estudiantes?\""
            );
        }

        let mut out = match intent.qualifier {
            Some(Qualifier::Best) => "🏆 **Los mejores profesores según tu consulta:**\n\n",
            Some(Qualifier::Worst) => "📊 **Profesores que podrían necesitar apoyo:**\n\n",
            _ => "👨‍🏫 **Información de profesores:**\n\n",
        }
        .to_string();

        match intent.scope {
            Some(Scope::Track(Track::Tsu)) => out.push_str("🎯 **Filtrado por:** Carreras TSU\n\n"),
            Some(Scope::Track(Track::Engineering)) => {
                out.push_str("🎯 **Filtrado por:** Carreras de Ingeniería\n\n")
            }
            _ => {}
        }

        for (i, teacher) in rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} **{}**",
                position_marker(i, intent.qualifier),
                teacher.full_name
            );
            let _ = writeln!(out, "   🎓 Carrera: {}", teacher.program_name);
            let _ = writeln!(out, "   📚 Asignaturas: {}", teacher.subjects_taught);
            let _ = writeln!(out, "   👥 Estudiantes evaluados: {}", teacher.students_evaluated);
            let _ = writeln!(out, "   📊 Promedio estudiantes: {}", avg(teacher.avg_grade));
            let _ = writeln!(out, "   ✅ Tasa de aprobación: {}%", avg(teacher.pass_rate));
            let _ = writeln!(out, "   ⏱️ Experiencia: {} años", teacher.years_experience);
            if teacher.is_group_tutor {
                out.push_str("   🎯 Es tutor grupal\n");
            }
            out.push('\n');
        }

        if intent.qualifier == Some(Qualifier::Best) {
            let top = &rows[0];
            let _ = write!(
                out,
                "💡 **{}** destaca con una tasa de aprobación del {}% y un promedio estudiantil de {}.",
                top.full_name,
                avg(top.pass_rate),
                avg(top.avg_grade)
            );
        }

        out
    }

    async fn student_reply(&self, intent: &Intent, message: &str) -> String {
        let rows = match self
            .analytics
            .student_rankings(intent.scope.as_ref(), intent.qualifier)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("student ranking query failed: {err}");
                return "Tuve un problema buscando información sobre estudiantes. ¿Podrías reformular tu pregunta?\n\n\
Ejemplos:\n\
• \"¿Cuál es el mejor estudiante del cuatrimestre 3?\"\n\
• \"Estudiante más reprobado de ingeniería\"\n\
• \"¿Quién tiene mejor promedio en TSU?\""
                    .to_string();
            }
        };

        if rows.is_empty() {
            return format!(
                "No encontré estudiantes que coincidan con \"{message}\". 🤔\n\n\
¿Podrías intentar:\n\
• \"¿Cuál es el mejor estudiante del cuatrimestre 2?\"\n\
• \"Estudiante más reprobado de TSU\"\n\
• \"¿Quién tiene mejor promedio en el grupo A?\""
            );
        }

        let mut out = match intent.qualifier {
            Some(Qualifier::Best) => "🌟 **Los estudiantes más sobresalientes:**\n\n",
            Some(Qualifier::Worst) => "📊 **Estudiantes que necesitan apoyo académico:**\n\n",
            _ => "👥 **Información de estudiantes:**\n\n",
        }
        .to_string();

        match &intent.scope {
            Some(Scope::Track(Track::Tsu)) => out.push_str("🎯 **Filtro:** Carreras TSU\n"),
            Some(Scope::Track(Track::Engineering)) => {
                out.push_str("🎯 **Filtro:** Carreras de Ingeniería\n")
            }
            Some(Scope::Term(n)) => {
                let _ = writeln!(out, "🎯 **Filtro:** Cuatrimestre {n}");
            }
            Some(Scope::Group(code)) => {
                let _ = writeln!(out, "🎯 **Filtro:** Grupo {code}");
            }
            None => {}
        }
        out.push('\n');

        for (i, student) in rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} **{}**",
                position_marker(i, intent.qualifier),
                student.full_name
            );
            let _ = writeln!(out, "   📋 Matrícula: {}", student.enrollment_number);
            let _ = writeln!(out, "   🎓 Carrera: {}", student.program_name);
            if let Some(group) = &student.group_code {
                let _ = writeln!(out, "   👥 Grupo: {group}");
            }
            let _ = writeln!(out, "   📈 Promedio general: {}", avg(student.gpa));
            let _ = writeln!(out, "   ✅ Materias aprobadas: {}", student.passed_count);
            if student.failed_count > 0 {
                let _ = writeln!(out, "   ❌ Materias reprobadas: {}", student.failed_count);
            }
        }

        let top = &rows[0];
        match intent.qualifier {
            Some(Qualifier::Best) => {
                let _ = write!(
                    out,
                    "🏆 **{}** lidera con un promedio de {}. ¡Excelente rendimiento!",
                    top.full_name,
                    avg(top.gpa)
                );
            }
            Some(Qualifier::Worst) if top.failed_count > 0 => {
                let _ = write!(
                    out,
                    "💡 **{}** podría beneficiarse de tutoría adicional ({} materias reprobadas).",
                    top.full_name, top.failed_count
                );
            }
            _ => {}
        }

        out
    }

    async fn group_reply(&self, intent: &Intent, message: &str) -> String {
        let rows = match self
            .analytics
            .group_rankings(intent.scope.as_ref(), intent.qualifier)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("group ranking query failed: {err}");
                return "Tuve un problema analizando los grupos. ¿Podrías ser más específico?\n\n\
Ejemplos:\n\
• \"¿Cuál es el mejor grupo de TSU?\"\n\
• \"Grupo con peor rendimiento del cuatrimestre 2\"\n\
• \"¿Qué grupo tiene más estudiantes?\""
                    .to_string();
            }
        };

        if rows.is_empty() {
            return format!(
                "No encontré grupos que coincidan con \"{message}\". 🤔\n\n\
¿Podrías intentar:\n\
• \"¿Cuál es el mejor grupo del cuatrimestre 3?\"\n\
• \"Grupo con peor rendimiento en TSU\"\n\
• \"¿Qué grupo tiene mejor promedio?\""
            );
        }

        let mut out = match intent.qualifier {
            Some(Qualifier::Best) => "🏆 **Los grupos con mejor rendimiento:**\n\n",
            Some(Qualifier::Worst) => "📊 **Grupos que necesitan atención:**\n\n",
            _ => "👥 **Información de grupos:**\n\n",
        }
        .to_string();

        match &intent.scope {
            Some(Scope::Track(Track::Tsu)) => out.push_str("🎯 **Filtro:** Carreras TSU\n"),
            Some(Scope::Track(Track::Engineering)) => {
                out.push_str("🎯 **Filtro:** Carreras de Ingeniería\n")
            }
            Some(Scope::Term(n)) => {
                let _ = writeln!(out, "🎯 **Filtro:** Cuatrimestre {n}");
            }
            _ => {}
        }
        out.push('\n');

        for (i, group) in rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} **Grupo {}**",
                position_marker(i, intent.qualifier),
                group.code
            );
            let _ = writeln!(out, "   🎓 Carrera: {}", group.program_name);
            let _ = writeln!(out, "   📊 Cuatrimestre: {}", group.term);
            let _ = writeln!(
                out,
                "   👥 Estudiantes: {}/{} ({}%)",
                group.member_count,
                group.capacity,
                avg(group.occupancy_pct)
            );
            let _ = writeln!(out, "   📈 Promedio grupal: {}", avg(group.group_avg));
            if let Some(rate) = group.pass_rate {
                let _ = writeln!(out, "   ✅ Tasa de aprobación: {rate:.2}%");
            }
            if let Some(tutor) = &group.tutor_name {
                let _ = writeln!(out, "   👨‍🏫 Tutor: {tutor}");
            }
            out.push('\n');
        }

        let top = &rows[0];
        match intent.qualifier {
            Some(Qualifier::Best) => {
                let _ = write!(
                    out,
                    "🌟 **El grupo {}** sobresale con un promedio de {}. ¡Excelente trabajo en equipo!",
                    top.code,
                    avg(top.group_avg)
                );
            }
            Some(Qualifier::Worst) => {
                let _ = write!(
                    out,
                    "💡 **El grupo {}** podría beneficiarse de apoyo adicional (promedio: {}).",
                    top.code,
                    avg(top.group_avg)
                );
            }
            _ => {}
        }

        out
    }

    async fn program_reply(&self, intent: &Intent) -> String {
        let rows = match self.analytics.program_overview().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("program overview query failed: {err}");
                return "Tuve un problema consultando las carreras. ¿Podrías reformular tu pregunta?"
                    .to_string();
            }
        };

        if rows.is_empty() {
            return "No encontré información sobre carreras. 🤔".to_string();
        }

        let mut out = "🎓 **Información de carreras en DTAI:**\n\n".to_string();

        let tsu: Vec<_> = rows.iter().filter(|p| p.duration_terms == 6).collect();
        let engineering: Vec<_> = rows.iter().filter(|p| p.duration_terms == 9).collect();

        let scope_is = |track: Track| intent.scope == Some(Scope::Track(track));
        if scope_is(Track::Tsu) || (intent.scope.is_none() && !tsu.is_empty()) {
            out.push_str("📚 **TÉCNICO SUPERIOR UNIVERSITARIO (TSU):**\n\n");
            for (i, program) in tsu.iter().enumerate() {
                write_program_entry(&mut out, i, program);
            }
        }
        if scope_is(Track::Engineering) || (intent.scope.is_none() && !engineering.is_empty()) {
            out.push_str("🔬 **INGENIERÍA:**\n\n");
            for (i, program) in engineering.iter().enumerate() {
                write_program_entry(&mut out, i, program);
            }
        }

        let best = &rows[0];
        if let Some(rate) = best.pass_rate {
            let _ = write!(out, "🏆 **{}** lidera con {rate:.2}% de aprobación.", best.name);
        }

        out
    }

    async fn staff_reply(&self) -> String {
        let rows = match self.analytics.staff_directory().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("staff directory query failed: {err}");
                return "Tuve un problema consultando información de directivos.".to_string();
            }
        };

        if rows.is_empty() {
            return "No encontré información sobre directivos activos. 🤔".to_string();
        }

        let mut out = format!("👔 **Equipo directivo de DTAI** ({} personas):\n\n", rows.len());

        for (i, member) in rows.iter().enumerate() {
            let rank_emoji = match member.access_level {
                AccessLevel::Director => "🎯",
                AccessLevel::DeputyDirector => "📋",
                AccessLevel::Coordinator => "⚙️",
            };
            let _ = writeln!(out, "{}. {} **{}**", i + 1, rank_emoji, member.full_name);
            let _ = writeln!(out, "   📄 Cargo: {}", member.position);
            let _ = writeln!(out, "   🏢 Nivel: {}", access_level_label(member.access_level));
            if let Some(program) = &member.program_name {
                let _ = writeln!(out, "   🎓 Carrera: {program}");
            }
            let _ = writeln!(out, "   📅 Desde: {}\n", member.appointed_on.year());
        }

        let _ = write!(
            out,
            "💼 El equipo directivo está bien estructurado con {} miembros activos.",
            rows.len()
        );

        out
    }

    async fn comparison_reply(&self) -> String {
        let rows = match self.analytics.track_comparison().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!("track comparison query failed: {err}");
                return "Tuve un problema haciendo la comparación. ¿Podrías ser más específico sobre qué quieres comparar?"
                    .to_string();
            }
        };

        if rows.is_empty() {
            return "No encontré datos suficientes para hacer comparaciones. 🤔".to_string();
        }

        let mut out = "📊 **Comparación TSU vs Ingeniería en DTAI:**\n\n".to_string();

        for (i, track) in rows.iter().enumerate() {
            let track_emoji = if track.track_name == "TSU" { "📚" } else { "🔬" };
            let marker = if i == 0 { "🥇" } else { "🥈" };
            let _ = writeln!(out, "{marker} {track_emoji} **{}**", track.track_name);
            let _ = writeln!(out, "   🎓 Carreras: {}", track.program_count);
            let _ = writeln!(out, "   👥 Estudiantes: {}", track.student_count);
            let _ = writeln!(out, "   👨‍🏫 Profesores: {}", track.teacher_count);
            let _ = writeln!(out, "   📊 Promedio: {}", avg(track.track_avg));
            if let Some(rate) = track.pass_rate {
                let _ = writeln!(out, "   ✅ Aprobación: {rate:.2}%");
            }
            out.push('\n');
        }

        if rows.len() >= 2 {
            let (leader, runner_up) = (&rows[0], &rows[1]);
            let difference =
                leader.track_avg.unwrap_or(0.0) - runner_up.track_avg.unwrap_or(0.0);
            let _ = write!(
                out,
                "🎯 **Análisis:** {} lidera con un promedio {difference:.2} puntos superior. ",
                leader.track_name
            );
            if leader.pass_rate.unwrap_or(0.0) > runner_up.pass_rate.unwrap_or(0.0) {
                out.push_str("También tiene mejor tasa de aprobación.");
            }
        }

        out
    }

    async fn statistics_reply(&self) -> String {
        let stats = match self.analytics.global_stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!("global stats query failed: {err}");
                return "Tuve un problema obteniendo las estadísticas. ¿Podrías preguntar algo más específico?"
                    .to_string();
            }
        };

        format!(
            "📊 **Estadísticas generales de DTAI:**\n\n\
🎓 **Estudiantes:**\n\
   • Total: {}\n\
   • Activos: {}\n\
   • Egresados: {}\n\
   • Promedio general: {}\n\n\
👨‍🏫 **Profesores:**\n\
   • Total activos: {}\n\
   • Tutores: {}\n\n\
🏫 **Carreras activas:** {}\n\n\
💡 La división mantiene un crecimiento estable con {} estudiantes activos y {} profesores comprometidos con la excelencia académica.\n\n\
¿Te interesa algún dato más específico?",
            stats.student_total,
            stats.students_active,
            stats.students_graduated,
            avg(stats.student_avg),
            stats.teacher_total,
            stats.teacher_tutors,
            stats.program_total,
            stats.students_active,
            stats.teacher_total,
        )
    }

    /// Last resort: substring search over student records using the first
    /// three content words of the message, at most five hits shown.
    async fn search_reply(&self, message: &str) -> String {
        let words: Vec<&str> = message
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .take(3)
            .collect();

        let mut hits = Vec::new();
        for word in words {
            match self.analytics.search_students(&word.to_lowercase(), 2).await {
                Ok(found) => hits.extend(found),
                Err(err) => {
                    tracing::warn!("fallback search query failed: {err}");
                    return format!(
                        "Interesante pregunta sobre \"{message}\". 🤔\n\n\
Aunque no pude procesarla completamente, puedo ayudarte con información muy específica sobre:\n\n\
📊 **Profesores:** rendimiento, experiencia, materias\n\
👥 **Estudiantes:** promedios, rankings, grupos\n\
🏫 **Grupos:** comparaciones, rendimiento\n\
🎓 **Carreras:** estadísticas, comparaciones\n\n\
¿Podrías reformular tu pregunta de manera más directa? Por ejemplo:\n\
• \"¿Cuál es el mejor [algo] de [contexto]?\"\n\
• \"¿Quién tiene más/menos [característica]?\"\n\n\
¡Estoy aquí para ayudarte! 🚀"
                    );
                }
            }
        }
        hits.truncate(5);

        if hits.is_empty() {
            return format!(
                "🤔 No encontré información específica sobre \"{message}\".\n\n{NO_MATCH_REPLY_TAIL}"
            );
        }

        let mut out = format!("🔍 **Encontré información relacionada con \"{message}\":**\n\n");
        for (i, hit) in hits.iter().enumerate() {
            let _ = writeln!(out, "{}. 👤 **{}**", i + 1, hit.full_name);
            let _ = writeln!(out, "   📋 Matrícula: {}", hit.enrollment_number);
            let _ = writeln!(out, "   🎓 Carrera: {}", hit.program_name);
            let _ = writeln!(out, "   📊 Promedio: {}\n", avg(hit.gpa));
        }
        out.push_str("💡 ¿Necesitas información más específica sobre alguno de estos estudiantes?");
        out
    }
}

fn greeting_reply() -> String {
    let index = rand::rng().random_range(0..GREETINGS.len());
    format!("{}{GREETING_HINT}", GREETINGS[index])
}

fn write_program_entry(out: &mut String, index: usize, program: &crate::domain::ProgramSummary) {
    let _ = writeln!(out, "{}. **{}** ({})", index + 1, program.name, program.code);
    let _ = writeln!(out, "   👥 Estudiantes: {}", program.student_count);
    let _ = writeln!(out, "   👨‍🏫 Profesores: {}", program.teacher_count);
    let _ = writeln!(out, "   📚 Asignaturas: {}", program.subject_count);
    let _ = writeln!(out, "   📊 Promedio: {}", avg(program.program_avg));
    if let Some(rate) = program.pass_rate {
        let _ = writeln!(out, "   ✅ Aprobación: {rate:.2}%");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        GlobalStats, GroupStanding, ProgramSummary, SearchHit, StaffMember, StudentStanding,
        TeacherStanding, TrackComparison,
    };
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;

    /// Scriptable in-memory analytics port. `fail = true` makes every query
    /// error, to exercise the per-handler fallbacks.
    #[derive(Default)]
    struct StubAnalytics {
        fail: bool,
        teachers: Vec<TeacherStanding>,
        students: Vec<StudentStanding>,
        groups: Vec<GroupStanding>,
        programs: Vec<ProgramSummary>,
        staff: Vec<StaffMember>,
        tracks: Vec<TrackComparison>,
        stats: Option<GlobalStats>,
        search: Vec<SearchHit>,
    }

    impl StubAnalytics {
        fn check(&self) -> PortResult<()> {
            if self.fail {
                Err(PortError::Unexpected("stubbed failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AnalyticsService for StubAnalytics {
        async fn teacher_rankings(
            &self,
            _scope: Option<&Scope>,
            _qualifier: Option<Qualifier>,
        ) -> PortResult<Vec<TeacherStanding>> {
            self.check()?;
            Ok(self.teachers.clone())
        }

        async fn student_rankings(
            &self,
            _scope: Option<&Scope>,
            _qualifier: Option<Qualifier>,
        ) -> PortResult<Vec<StudentStanding>> {
            self.check()?;
            Ok(self.students.clone())
        }

        async fn group_rankings(
            &self,
            _scope: Option<&Scope>,
            _qualifier: Option<Qualifier>,
        ) -> PortResult<Vec<GroupStanding>> {
            self.check()?;
            Ok(self.groups.clone())
        }

        async fn program_overview(&self) -> PortResult<Vec<ProgramSummary>> {
            self.check()?;
            Ok(self.programs.clone())
        }

        async fn staff_directory(&self) -> PortResult<Vec<StaffMember>> {
            self.check()?;
            Ok(self.staff.clone())
        }

        async fn track_comparison(&self) -> PortResult<Vec<TrackComparison>> {
            self.check()?;
            Ok(self.tracks.clone())
        }

        async fn global_stats(&self) -> PortResult<GlobalStats> {
            self.check()?;
            self.stats
                .ok_or_else(|| PortError::Unexpected("no stats scripted".to_string()))
        }

        async fn search_students(&self, _term: &str, limit: i64) -> PortResult<Vec<SearchHit>> {
            self.check()?;
            Ok(self.search.iter().take(limit as usize).cloned().collect())
        }
    }

    fn teacher(name: &str, rate: f64, avg_grade: f64) -> TeacherStanding {
        TeacherStanding {
            full_name: name.to_string(),
            program_name: "TSU en TI".to_string(),
            subjects_taught: 3,
            students_evaluated: 40,
            avg_grade: Some(avg_grade),
            pass_rate: Some(rate),
            years_experience: 8,
            is_group_tutor: false,
        }
    }

    fn assistant(stub: StubAnalytics) -> Assistant {
        Assistant::new(Arc::new(stub))
    }

    #[tokio::test]
    async fn best_teacher_of_tsu_gets_medals_and_track_filter() {
        let stub = StubAnalytics {
            teachers: vec![
                teacher("Laura Pérez", 92.5, 8.9),
                teacher("Hugo Ramos", 88.0, 8.4),
            ],
            ..Default::default()
        };
        let reply = assistant(stub)
            .respond("¿Cuál es el mejor profesor de TSU?")
            .await;

        assert!(reply.starts_with("🏆"));
        assert!(reply.contains("🎯 **Filtrado por:** Carreras TSU"));
        assert!(reply.contains("🥇 **Laura Pérez**"));
        assert!(reply.contains("🥈 **Hugo Ramos**"));
        assert!(reply.contains("💡 **Laura Pérez** destaca"));
    }

    #[tokio::test]
    async fn unqualified_teacher_listing_uses_plain_ordinals() {
        let stub = StubAnalytics {
            teachers: vec![teacher("Laura Pérez", 92.5, 8.9)],
            ..Default::default()
        };
        let reply = assistant(stub).respond("información de profesores").await;

        assert!(reply.contains("1. **Laura Pérez**"));
        assert!(!reply.contains("🥇"));
    }

    #[tokio::test]
    async fn teacher_query_fault_becomes_conversational_fallback() {
        let stub = StubAnalytics {
            fail: true,
            ..Default::default()
        };
        let reply = assistant(stub).respond("el mejor profesor").await;

        assert!(reply.contains("Tuve un problema buscando información sobre profesores"));
        assert!(reply.contains("¿Qué docente tiene mejor tasa de aprobación?"));
    }

    #[tokio::test]
    async fn subject_beats_category_in_dispatch_priority() {
        // "hola" is a greeting but the teacher subject must win.
        let stub = StubAnalytics {
            teachers: vec![teacher("Laura Pérez", 92.5, 8.9)],
            ..Default::default()
        };
        let reply = assistant(stub).respond("hola, dame los profesores").await;

        assert!(reply.contains("Laura Pérez"));
        assert!(!reply.contains("Soy tu asistente"));
    }

    #[tokio::test]
    async fn greeting_always_carries_the_usage_hint() {
        let reply = assistant(StubAnalytics::default()).respond("hola").await;
        assert!(reply.contains("💡 **Ejemplos de lo que puedo hacer:**"));
    }

    #[tokio::test]
    async fn help_reply_is_the_capability_description() {
        let reply = assistant(StubAnalytics::default())
            .respond("¿qué puedes hacer?")
            .await;
        assert!(reply.contains("SOY CONVERSACIONAL"));
    }

    #[tokio::test]
    async fn statistics_reply_reports_counters() {
        let stub = StubAnalytics {
            stats: Some(GlobalStats {
                student_total: 250,
                students_active: 230,
                students_graduated: 20,
                student_avg: Some(8.41),
                teacher_total: 30,
                teacher_tutors: 12,
                program_total: 5,
            }),
            ..Default::default()
        };
        let reply = assistant(stub).respond("dame un resumen").await;

        assert!(reply.contains("• Total: 250"));
        assert!(reply.contains("• Promedio general: 8.41"));
        assert!(reply.contains("🏫 **Carreras activas:** 5"));
    }

    #[tokio::test]
    async fn comparison_reply_analyses_the_leading_track() {
        let track = |name: &str, avg: f64, rate: f64| TrackComparison {
            track_name: name.to_string(),
            program_count: 3,
            student_count: 120,
            teacher_count: 15,
            track_avg: Some(avg),
            pass_rate: Some(rate),
        };
        let stub = StubAnalytics {
            tracks: vec![track("TSU", 8.7, 90.0), track("Ingeniería", 8.2, 84.0)],
            ..Default::default()
        };
        let reply = assistant(stub).respond("comparar el rendimiento").await;

        assert!(reply.contains("📊 **Comparación TSU vs Ingeniería en DTAI:**"));
        assert!(reply.contains("🎯 **Análisis:** TSU lidera con un promedio 0.50 puntos superior."));
        assert!(reply.contains("También tiene mejor tasa de aprobación."));
    }

    #[tokio::test]
    async fn unrecognized_message_with_no_hits_shows_rephrasing_examples() {
        let reply = assistant(StubAnalytics::default())
            .respond("anastasio dominguez zapateria")
            .await;

        assert!(reply.contains("🤔 No encontré información específica"));
        assert!(reply.contains("🎯 **Consultas específicas:**"));
        assert!(reply.contains("🔍 **O búsquedas por nombre:**"));
    }

    #[tokio::test]
    async fn fallback_search_caps_results_at_five() {
        let hit = |name: &str| SearchHit {
            full_name: name.to_string(),
            enrollment_number: "2023-0042".to_string(),
            program_name: "TSU en TI".to_string(),
            gpa: Some(8.0),
        };
        // Two hits per content word, three words: six collected, five shown.
        let stub = StubAnalytics {
            search: vec![hit("Ana López"), hit("Luis Mata")],
            ..Default::default()
        };
        let reply = assistant(stub)
            .respond("anastasio dominguez zapateria")
            .await;

        assert_eq!(reply.matches("👤").count(), 5);
        assert!(reply.contains("Ana López"));
    }

    #[tokio::test]
    async fn classifying_twice_yields_identical_replies_for_deterministic_paths() {
        let make = || StubAnalytics {
            students: vec![StudentStanding {
                full_name: "Ana López".to_string(),
                enrollment_number: "2023-0042".to_string(),
                program_name: "TSU en TI".to_string(),
                group_code: Some("A1".to_string()),
                gpa: Some(9.1),
                passed_count: 14,
                failed_count: 0,
            }],
            ..Default::default()
        };
        let msg = "la mejor estudiante del cuatrimestre 3";
        let first = assistant(make()).respond(msg).await;
        let second = assistant(make()).respond(msg).await;
        assert_eq!(first, second);
    }
}
