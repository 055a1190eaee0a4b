use crate::markup::{Attribute, Element, Template};

/// An attribute together with the element carrying it.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMatch<'t> {
    pub element: &'t Element,
    pub attr: &'t Attribute,
}

pub fn elements_named<'t>(template: &'t Template, name: &str) -> Vec<&'t Element> {
    template.find_elements(|e| e.name == name)
}

/// Attributes whose bare name (binding brackets stripped) is `name`, on any
/// element.
pub fn attributes_named<'t>(template: &'t Template, name: &str) -> Vec<AttributeMatch<'t>> {
    template
        .find_elements(|e| e.attrs.iter().any(|a| a.bare_name() == name))
        .into_iter()
        .flat_map(|element| {
            element
                .attrs
                .iter()
                .filter(move |a| a.bare_name() == name)
                .map(move |attr| AttributeMatch { element, attr })
        })
        .collect()
}

/// Whitespace-separated tokens of the static `class` attribute.
pub fn class_tokens(element: &Element) -> Option<(&Attribute, Vec<&str>)> {
    let attr = element.attr("class")?;
    let value = attr.value.as_ref()?;
    Some((attr, value.text.split_whitespace().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    #[test]
    fn test_attributes_named_matches_bindings() {
        let template =
            parse(r#"<button siPopover="a"></button><div [siPopover]="b" siPopoverNext></div>"#).unwrap();
        let found = attributes_named(&template, "siPopover");
        let names: Vec<_> = found.iter().map(|m| m.attr.name.as_str()).collect();
        assert_eq!(names, vec!["siPopover", "[siPopover]"]);
        assert_eq!(found[1].element.name, "div");
    }

    #[test]
    fn test_class_tokens() {
        let template = parse(r#"<a class=" btn  btn-xs "></a><b [class]="x"></b>"#).unwrap();
        let elements = template.find_elements(|_| true);
        let (_, tokens) = class_tokens(elements[0]).unwrap();
        assert_eq!(tokens, vec!["btn", "btn-xs"]);
        assert!(class_tokens(elements[1]).is_none());
        assert_eq!(elements_named(&template, "b").len(), 1);
    }
}
