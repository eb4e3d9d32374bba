#![forbid(unsafe_code)]

use crate::event::EventKind;

/// Sub-class of a set-information operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InformationClass {
    Basic,
    Rename,
    RenameEx,
    Disposition,
    DispositionEx,
    EndOfFile,
    Allocation,
    Link,
    Other(u32),
}

/// Category of an intercepted file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCategory {
    Create,
    Read,
    Write,
    SetInformation(InformationClass),
    QueryInformation,
    DirectoryControl,
    Cleanup,
    Close,
    Other(u8),
}

/// Advisory verdict. The operation proceeds either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    NotInteresting,
    Classified(EventKind),
}

impl Classification {
    pub const fn kind(self) -> Option<EventKind> {
        match self {
            Self::Classified(kind) => Some(kind),
            Self::NotInteresting => None,
        }
    }
}

/// Map an operation category to an event kind.
///
/// Runs for every subscribed operation, so it must stay branch-only.
#[inline]
pub const fn classify(category: OperationCategory) -> Classification {
    use Classification::{Classified, NotInteresting};

    match category {
        OperationCategory::Create => Classified(EventKind::Create),
        OperationCategory::Read => Classified(EventKind::Read),
        OperationCategory::Write => Classified(EventKind::Write),
        OperationCategory::SetInformation(class) => match class {
            InformationClass::Rename | InformationClass::RenameEx => Classified(EventKind::Rename),
            InformationClass::Disposition | InformationClass::DispositionEx => {
                Classified(EventKind::Delete)
            }
            _ => NotInteresting,
        },
        _ => NotInteresting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn data_operations_map_directly() {
        assert_eq!(classify(OperationCategory::Create), Classification::Classified(EventKind::Create));
        assert_eq!(classify(OperationCategory::Read), Classification::Classified(EventKind::Read));
        assert_eq!(classify(OperationCategory::Write), Classification::Classified(EventKind::Write));
    }

    #[test]
    fn set_information_depends_on_sub_class() {
        let rename = OperationCategory::SetInformation(InformationClass::Rename);
        let rename_ex = OperationCategory::SetInformation(InformationClass::RenameEx);
        let delete = OperationCategory::SetInformation(InformationClass::Disposition);
        let delete_ex = OperationCategory::SetInformation(InformationClass::DispositionEx);
        let basic = OperationCategory::SetInformation(InformationClass::Basic);

        assert_eq!(classify(rename).kind(), Some(EventKind::Rename));
        assert_eq!(classify(rename_ex).kind(), Some(EventKind::Rename));
        assert_eq!(classify(delete).kind(), Some(EventKind::Delete));
        assert_eq!(classify(delete_ex).kind(), Some(EventKind::Delete));
        assert_eq!(classify(basic), Classification::NotInteresting);
    }

    #[test]
    fn classification_is_usable_in_const_context() {
        const WRITE: Classification = classify(OperationCategory::Write);
        assert_eq!(WRITE.kind(), Some(EventKind::Write));
    }

    fn uninteresting_category() -> impl Strategy<Value = OperationCategory> {
        prop_oneof![
            Just(OperationCategory::QueryInformation),
            Just(OperationCategory::DirectoryControl),
            Just(OperationCategory::Cleanup),
            Just(OperationCategory::Close),
            any::<u8>().prop_map(OperationCategory::Other),
            any::<u32>().prop_map(|c| OperationCategory::SetInformation(InformationClass::Other(c))),
            Just(OperationCategory::SetInformation(InformationClass::Basic)),
            Just(OperationCategory::SetInformation(InformationClass::EndOfFile)),
            Just(OperationCategory::SetInformation(InformationClass::Allocation)),
            Just(OperationCategory::SetInformation(InformationClass::Link)),
        ]
    }

    proptest! {
        #[test]
        fn everything_else_is_not_interesting(category in uninteresting_category()) {
            prop_assert_eq!(classify(category), Classification::NotInteresting);
        }
    }
}
