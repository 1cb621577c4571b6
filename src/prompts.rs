//! Interviewer instructions per job role

pub const DEFAULT_ROLE: &str = "software_engineer";

const COMMON: &str = "\
You are a warm, professional AI interviewer conducting a one-on-one voice interview. \
Be patient, listen carefully, ask one question at a time and keep answers short. \
Follow up on vague answers with a request for a concrete example. \
Never reveal scores or hiring decisions to the candidate.";

const ROLES: &[(&str, &str, &str)] = &[
    (
        "software_engineer",
        "Software Engineer",
        "Cover recent projects, system design trade-offs, debugging approach, \
         code quality practices and collaboration in a team.",
    ),
    (
        "data_scientist",
        "Data Scientist",
        "Cover modelling experience, experiment design, statistics fundamentals, \
         data quality problems and communicating results to stakeholders.",
    ),
    (
        "product_manager",
        "Product Manager",
        "Cover product discovery, prioritisation frameworks, metrics, \
         stakeholder management and a product the candidate shipped.",
    ),
    (
        "frontend_developer",
        "Frontend Developer",
        "Cover UI architecture, state management, performance, accessibility \
         and cross-browser testing.",
    ),
    (
        "devops_engineer",
        "DevOps Engineer",
        "Cover CI/CD pipelines, infrastructure as code, observability, \
         incident response and automation.",
    ),
];

/// Known role tags
pub fn available_roles() -> Vec<&'static str> {
    ROLES.iter().map(|(tag, _, _)| *tag).collect()
}

pub fn is_known_role(role: &str) -> bool {
    ROLES.iter().any(|(tag, _, _)| *tag == role)
}

/// Instructions for `role`, falling back to the software engineer script
pub fn instructions_for(role: &str) -> String {
    let (_, title, focus) = ROLES
        .iter()
        .find(|(tag, _, _)| *tag == role)
        .or_else(|| ROLES.iter().find(|(tag, _, _)| *tag == DEFAULT_ROLE))
        .copied()
        .unwrap_or(ROLES[0]);

    format!(
        "{}\n\nThis interview is for a {} position. {}",
        COMMON, title, focus
    )
}
