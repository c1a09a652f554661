//! Static advisory text keyed by predicted label.

/// Advice for labels the table does not know about.
pub const FALLBACK_ADVICE: &str = "No specific guidance is available for this result. \
Isolate affected plants, remove visibly infected parts, and consult a local agricultural \
extension expert for a confirmed diagnosis and treatment plan.";

const HEALTHY_ADVICE: &str = "The plant looks healthy. Continue the regular watering and \
fertilization routine, keep the growing area clean, and monitor leaves regularly for early \
signs of disease.";

/// Disease keyword -> advice. Matched against the disease part of a
/// `Crop___Disease` label, case-insensitively.
static DISEASE_ADVICE: &[(&str, &str)] = &[
    (
        "apple scab",
        "Rake and destroy fallen leaves, prune for airflow, and apply captan or sulfur \
         fungicide from green tip through petal fall.",
    ),
    (
        "black rot",
        "Remove mummified fruit and cankered wood, clean up debris, and apply a protectant \
         fungicide during bloom and early fruit set.",
    ),
    (
        "cedar apple rust",
        "Remove nearby juniper galls where possible and apply myclobutanil or sulfur \
         sprays from pink bud until a few weeks after bloom.",
    ),
    (
        "powdery mildew",
        "Apply sulfur or potassium bicarbonate, improve air circulation, remove infected \
         leaves, and avoid overhead watering.",
    ),
    (
        "cercospora leaf spot",
        "Rotate away from corn, till residue, plant resistant hybrids, and apply a \
         strobilurin fungicide if lesions reach the upper canopy.",
    ),
    (
        "common rust",
        "Plant resistant hybrids and apply a foliar fungicide early if pustules spread \
         quickly in cool, humid weather.",
    ),
    (
        "northern leaf blight",
        "Rotate crops, bury infected residue, choose resistant hybrids, and apply \
         fungicide at tasseling when disease pressure is high.",
    ),
    (
        "esca",
        "Prune out infected wood during dry weather, protect pruning wounds, and remove \
         severely affected vines.",
    ),
    (
        "leaf blight",
        "Remove infected leaves, improve canopy airflow, and apply a copper-based \
         fungicide after rain events.",
    ),
    (
        "haunglongbing",
        "Remove infected trees, control Asian citrus psyllid populations, and replant \
         only certified disease-free nursery stock.",
    ),
    (
        "bacterial spot",
        "Remove and destroy infected leaves, apply copper-based bactericides in cool dry \
         weather, avoid overhead watering, and rotate with non-susceptible crops.",
    ),
    (
        "early blight",
        "Remove lower infected leaves, apply neem oil or copper spray, mulch to prevent \
         soil splash, and water at the base of plants.",
    ),
    (
        "late blight",
        "Destroy all infected plant material immediately, apply chlorothalonil or copper \
         fungicide, improve drainage, and consider resistant varieties.",
    ),
    (
        "leaf scorch",
        "Remove infected leaves after harvest, avoid overhead irrigation, and renovate \
         beds to improve air movement.",
    ),
    (
        "leaf mold",
        "Increase ventilation, keep humidity below 85%, remove infected leaves promptly, \
         and apply sulfur-based fungicide if needed.",
    ),
    (
        "septoria leaf spot",
        "Remove infected leaves, apply copper spray, mulch against spore splash, rotate \
         crops annually, and water early in the day.",
    ),
    (
        "spider mites",
        "Dislodge mites with a strong water spray, apply neem oil or insecticidal soap, \
         and introduce predatory mites.",
    ),
    (
        "target spot",
        "Remove infected debris, apply copper-based fungicide, prune for air circulation, \
         and practice crop rotation.",
    ),
    (
        "yellow leaf curl virus",
        "Remove infected plants, control whiteflies with insecticidal soap or reflective \
         mulch, and plant virus-resistant varieties.",
    ),
    (
        "mosaic virus",
        "Remove infected plants, control aphids, disinfect tools between plants, and \
         remove weeds that harbor the virus.",
    ),
];

/// Full disease parts of the compound PlantVillage labels -> table key.
static COMPOUND_LABELS: &[(&str, &str)] = &[
    ("cercospora leaf spot gray leaf spot", "cercospora leaf spot"),
    ("esca black measles", "esca"),
    ("leaf blight isariopsis leaf spot", "leaf blight"),
    ("haunglongbing citrus greening", "haunglongbing"),
    ("spider mites two-spotted spider mite", "spider mites"),
    ("tomato yellow leaf curl virus", "yellow leaf curl virus"),
    ("tomato mosaic virus", "mosaic virus"),
];

fn advice_for(key: &str) -> Option<&'static str> {
    DISEASE_ADVICE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, advice)| *advice)
}

/// Returns the advisory text for `label`. Never fails.
///
/// Only exact disease names and the known compound labels resolve; anything
/// else gets [`FALLBACK_ADVICE`].
pub fn recommend(label: &str) -> &'static str {
    let disease = disease_part(label);

    if disease.contains("healthy") {
        return HEALTHY_ADVICE;
    }

    if let Some(advice) = advice_for(&disease) {
        return advice;
    }

    COMPOUND_LABELS
        .iter()
        .find(|(full, _)| *full == disease)
        .and_then(|(_, key)| advice_for(key))
        .unwrap_or(FALLBACK_ADVICE)
}

/// `"Tomato___Early_blight"` -> `"early blight"`.
fn disease_part(label: &str) -> String {
    let raw = label.rsplit("___").next().unwrap_or(label);
    raw.replace(['_', '(', ')', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
