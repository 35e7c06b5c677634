use serde_json::Value;

/// Walk `path` through nested objects.
///
/// Returns `None` as soon as a level is missing or is not an object; never panics.
///
/// ```
/// use domain_directory::lookup_path;
/// use serde_json::json;
///
/// let user = json!({"customSchemas": {"HR": {"employeeId": "E-7"}}});
/// assert_eq!(lookup_path(&user, &["customSchemas", "HR", "employeeId"]), Some(&json!("E-7")));
/// assert_eq!(lookup_path(&user, &["customSchemas", "Payroll", "employeeId"]), None);
/// ```
pub fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object()?.get(*segment))
}
