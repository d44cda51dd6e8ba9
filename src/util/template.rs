use std::fs;
use std::path::Path;

use serde::Serialize;

pub fn render_template<T: Serialize>(template: &str, context: &T) -> tera::Result<String> {
    let context = tera::Context::from_serialize(context)?;
    tera::Tera::one_off(template, &context, false)
}

pub fn read_template(path: &Path) -> std::io::Result<String> {
    fs::read_to_string(path)
}
