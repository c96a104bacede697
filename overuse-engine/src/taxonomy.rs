//! Fixed procedure-name to clinical-category table.

use serde::{Deserialize, Serialize};

/// One of the twelve categories the classifier was trained on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ConsultationDiagnosis,
    PreventionProphylaxis,
    Emergency,
    RadiologyExams,
    RestorativeDentistry,
    OralSurgeryExtractions,
    Endodontics,
    Periodontics,
    Pediatric,
    Orthodontics,
    Aesthetic,
    Prosthodontics,
}

impl Category {
    /// All categories in feature-column order.
    pub const ALL: [Category; 12] = [
        Category::ConsultationDiagnosis,
        Category::PreventionProphylaxis,
        Category::Emergency,
        Category::RadiologyExams,
        Category::RestorativeDentistry,
        Category::OralSurgeryExtractions,
        Category::Endodontics,
        Category::Periodontics,
        Category::Pediatric,
        Category::Orthodontics,
        Category::Aesthetic,
        Category::Prosthodontics,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::ConsultationDiagnosis => "Consultas e Diagnóstico",
            Category::PreventionProphylaxis => "Prevenção e Profilaxia",
            Category::Emergency => "Urgência e Emergência 24h",
            Category::RadiologyExams => "Radiologia e Exames",
            Category::RestorativeDentistry => "Dentística",
            Category::OralSurgeryExtractions => "Cirurgia Oral e Extrações",
            Category::Endodontics => "Endodontia",
            Category::Periodontics => "Periodontia",
            Category::Pediatric => "Odontopediatria",
            Category::Orthodontics => "Ortodontia",
            Category::Aesthetic => "Odontologia Estética",
            Category::Prosthodontics => "Próteses Dentárias",
        }
    }

    /// Name of the count column for this category in the feature vector.
    pub fn column_name(self) -> String {
        let stripped: String = self
            .display_name()
            .chars()
            .filter(|c| !matches!(c, ' ' | '(' | ')' | '/'))
            .collect();
        format!("count_{stripped}")
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Maps a procedure type name to its category. Unknown names yield `None`.
pub fn category_for(procedure_type: &str) -> Option<Category> {
    use Category::*;

    let category = match procedure_type {
        "Consulta odontológica geral"
        | "Avaliação clínica e diagnóstico"
        | "Consulta para clareamento"
        | "Consulta para próteses"
        | "Acompanhamento ortodôntico" => ConsultationDiagnosis,
        "Limpeza dental (profilaxia)"
        | "Aplicação de flúor"
        | "Aplicação de selante"
        | "Instrução de higiene bucal" => PreventionProphylaxis,
        "Atendimento odontológico de urgência"
        | "Alívio de dor"
        | "Drenagem de abscessos"
        | "Controle de hemorragias" => Emergency,
        "Radiografia intraoral"
        | "Radiografia panorâmica"
        | "Documentação ortodôntica completa"
        | "Tomografia computadorizada" => RadiologyExams,
        "Restauração em resina composta"
        | "Restauração em amálgama"
        | "Troca de restaurações antigas" => RestorativeDentistry,
        "Extração de dente comum" | "Extração de dente do siso" | "Frenectomia lingual e labial" => {
            OralSurgeryExtractions
        }
        "Canal em dentes anteriores" | "Canal em dentes posteriores" | "Retratamento endodôntico" => {
            Endodontics
        }
        "Tratamento de gengivite" | "Raspagem de tártaro" | "Cirurgia periodontal" => Periodontics,
        "Atendimento odontológico para crianças"
        | "Aplicação de flúor e selante"
        | "Tratamento restaurador em dentes de leite"
        | "Extração de dentes de leite" => Pediatric,
        "Instalação de aparelho fixo metálico"
        | "Manutenção mensal do aparelho"
        | "Retirada do aparelho ortodôntico"
        | "Mantenedores ortodônticos" => Orthodontics,
        "Clareamento dental caseiro" | "Clareamento estético em consultório" => Aesthetic,
        "Prótese fixa (coroa unitária)"
        | "Prótese removível total (dentadura)"
        | "Prótese removível parcial"
        | "Prótese sobre cerâmica ou resina"
        | "Placa de mordida para bruxismo" => Prosthodontics,
        _ => return None,
    };
    Some(category)
}

/// Completed-procedure counters, one slot per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts([u32; 12]);

impl CategoryCounts {
    pub fn increment(&mut self, category: Category) {
        self.0[category.index()] += 1;
    }

    pub fn get(&self, category: Category) -> u32 {
        self.0[category.index()]
    }

    /// Pairs of category and count in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.iter().map(move |&cat| (cat, self.get(cat)))
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}
