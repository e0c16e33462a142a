//! SQL operations, grouped by table. Free functions over `&Connection`
//! so they compose inside transactions owned by the caller.

pub mod event_ops;
pub mod kv_ops;
pub mod maintenance;
pub mod session_ops;

/// Render ids as a comma-separated list for an IN clause. Ids are
/// integers, so inlining them is safe.
pub(crate) fn id_list(ids: &[i64]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&id.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_renders_comma_separated() {
        assert_eq!(id_list(&[]), "");
        assert_eq!(id_list(&[7]), "7");
        assert_eq!(id_list(&[1, 2, 30]), "1,2,30");
    }
}
