use crate::program::SourceFile;
use regex::Regex;

/// Cheap pre-filter: does `file` import anything from a module matching
/// `module`?
pub fn imports_from(file: &SourceFile, module: &Regex) -> bool {
    file.imports().from_module(module).next().is_some()
}

/// Like [`imports_from`], but at least one of `symbols` must be among the
/// named imports. An empty `symbols` list only checks the module.
pub fn imports_symbols(file: &SourceFile, module: &Regex, symbols: &[String]) -> bool {
    file.imports().has_import(module, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefilter() {
        let file = SourceFile::parse(
            "a.ts",
            "import { SiModalService } from '@simpl/element-ng/modal';\nconst x = 1;\n".to_string(),
        )
        .unwrap();
        let module = Regex::new(r"@(siemens|simpl)/element-ng(/modal)?").unwrap();
        assert!(imports_from(&file, &module));
        assert!(imports_symbols(&file, &module, &["SiModalService".to_string()]));
        assert!(!imports_symbols(&file, &module, &["Other".to_string()]));
        assert!(!imports_from(&file, &Regex::new("@angular/core").unwrap()));
    }
}
