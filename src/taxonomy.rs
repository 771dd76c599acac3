//! Fixed classification catalogs used by the consultation engine
//!
//! Indices are 1-based and stable across the system; the backend stores only
//! the integers, so every display surface resolves labels through these
//! tables.

use crate::models::ResponseCategory;

/// (index, label) display catalog
pub type TypeCatalog = &'static [(u8, &'static str)];

/// Risk (crisis) types, indices 1-8
pub const RISK_TYPES: TypeCatalog = &[
    (1, "요금체납"),
    (2, "주거위기"),
    (3, "고용위기"),
    (4, "급여/서비스 탈락 및 미이용"),
    (5, "긴급상황 위기"),
    (6, "건강위기"),
    (7, "에너지위기"),
    (8, "기타"),
];

/// Desire (need) types, indices 1-11
pub const DESIRE_TYPES: TypeCatalog = &[
    (1, "안전"),
    (2, "건강"),
    (3, "일상생활유지"),
    (4, "가족관계"),
    (5, "사회적 관계"),
    (6, "경제"),
    (7, "교육"),
    (8, "고용"),
    (9, "생활환경"),
    (10, "법률 및 권익보장"),
    (11, "기타"),
];

/// Exception outcomes, indices 1-6
pub const EXCEPTION_TYPES: TypeCatalog = &[
    (1, "신상정보불일치"),
    (2, "상담거부"),
    (3, "의사소통불가"),
    (4, "부적절한답변"),
    (5, "연결끊어짐"),
    (6, "전화미수신"),
];

/// Deep-dive triggers, indices 1-2
pub const DEEP_DIVE_TYPES: TypeCatalog = &[
    (1, "심층상담을 원함"),
    (2, "알아낸 취약 정보가 중대함"),
];

fn lookup(catalog: TypeCatalog, index: u8) -> Option<&'static str> {
    catalog
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, label)| *label)
}

pub fn risk_type_label(index: u8) -> Option<&'static str> {
    lookup(RISK_TYPES, index)
}

pub fn desire_type_label(index: u8) -> Option<&'static str> {
    lookup(DESIRE_TYPES, index)
}

pub fn exception_type_label(index: u8) -> Option<&'static str> {
    lookup(EXCEPTION_TYPES, index)
}

pub fn deep_dive_type_label(index: u8) -> Option<&'static str> {
    lookup(DEEP_DIVE_TYPES, index)
}

/// Catalog for a response category
pub fn catalog_for(category: ResponseCategory) -> TypeCatalog {
    match category {
        ResponseCategory::Exception => EXCEPTION_TYPES,
        ResponseCategory::Risk => RISK_TYPES,
        ResponseCategory::Desire => DESIRE_TYPES,
        ResponseCategory::DeepDive => DEEP_DIVE_TYPES,
    }
}

/// Label with a fallback for indices the catalog does not know
pub fn risk_label_or_unknown(index: u8) -> String {
    risk_type_label(index)
        .map(str::to_string)
        .unwrap_or_else(|| format!("위기유형 {}", index))
}

pub fn desire_label_or_unknown(index: u8) -> String {
    desire_type_label(index)
        .map(str::to_string)
        .unwrap_or_else(|| format!("욕구유형 {}", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(risk_type_label(1), Some("요금체납"));
        assert_eq!(desire_type_label(11), Some("기타"));
        assert_eq!(exception_type_label(6), Some("전화미수신"));
        assert_eq!(deep_dive_type_label(2), Some("알아낸 취약 정보가 중대함"));
    }

    #[test]
    fn test_unknown_index() {
        assert_eq!(risk_type_label(0), None);
        assert_eq!(risk_type_label(9), None);
        assert_eq!(desire_type_label(12), None);
        assert_eq!(risk_label_or_unknown(9), "위기유형 9");
    }

    #[test]
    fn test_catalog_for_category() {
        assert_eq!(catalog_for(ResponseCategory::Risk).len(), 8);
        assert_eq!(catalog_for(ResponseCategory::Desire).len(), 11);
        assert_eq!(catalog_for(ResponseCategory::Exception).len(), 6);
        assert_eq!(catalog_for(ResponseCategory::DeepDive).len(), 2);
    }
}
