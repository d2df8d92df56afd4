//! Single-character lookup.
//!
//! Every field is one SQL expression over the bound character `@ucs`; the
//! selected fields are combined into one `json_object(...)` so the dataset
//! returns the whole response body as JSON text.

use crate::error::{Error, Result};

/// A named lookup field and the SQL expression producing its value.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub expr: &'static str,
}

/// Lookup fields in response order. Expressions yielding JSON are wrapped in
/// `json(...)` so they nest as values rather than strings.
pub const FIELDS: &[Field] = &[
    Field {
        name: "char",
        expr: "@ucs",
    },
    Field {
        name: "UCS",
        expr: "printf('U+%04X', unicode(@ucs))",
    },
    Field {
        name: "aj1",
        expr: "json((SELECT json_object('CID', CID) FROM aj1 WHERE aj1.UCS = @ucs))",
    },
    Field {
        name: "ids",
        expr: "json((SELECT json_group_array(json_object('IDS', ids.IDS, 'source', ids.source))
                FROM ids WHERE ids.UCS = @ucs))",
    },
    Field {
        name: "ids_similar",
        expr: "json((SELECT json_group_array(json_object('UCS', ids.UCS, 'IDS', ids.IDS, 'source', ids.source))
                FROM ids WHERE ids.IDS glob ('[〾↔↷]' || @ucs)))",
    },
    Field {
        name: "ids_comment",
        expr: "json((SELECT json_group_array(ids_comment.comment)
                FROM ids_comment WHERE ids_comment.UCS = @ucs))",
    },
    Field {
        name: "ivs",
        expr: "json((SELECT json_group_array(json_object(
                    'char', ivs.IVS,
                    'IVS', printf('%04X_%04X', unicode(ivs.IVS), unicode(substr(ivs.IVS, 2))),
                    'collection', ivs.collection,
                    'code', ivs.code))
                FROM ivs WHERE ivs.IVS glob (@ucs || '*')))",
    },
    Field {
        name: "svs_cjkci",
        expr: "json((SELECT json_group_array(json_object(
                    'SVS_char', SVS,
                    'SVS', printf('%04X_%04X', unicode(SVS), unicode(substr(SVS, 2))),
                    'CJKCI_char', CJKCI,
                    'CJKCI', printf('U+%04X', unicode(CJKCI))))
                FROM svs_cjkci
                WHERE (SVS glob @ucs || '*') OR (CJKCI glob @ucs || '*')))",
    },
    Field {
        name: "unihan",
        expr: "json((SELECT json_group_object(property, value) FROM unihan WHERE unihan.UCS = @ucs))",
    },
    Field {
        name: "unihan_variant",
        expr: "json((SELECT json_group_array(CASE
                    WHEN additional_data IS NOT NULL
                    THEN json_array(property, printf('U+%04X', unicode(value)), value, additional_data)
                    ELSE json_array(property, printf('U+%04X', unicode(value)), value) END)
                FROM unihan_variant WHERE unihan_variant.UCS = @ucs))",
    },
    Field {
        name: "unihan_variant_inverse",
        expr: "json((SELECT json_group_array(CASE
                    WHEN additional_data IS NOT NULL
                    THEN json_array(property, printf('U+%04X', unicode(UCS)), UCS, additional_data)
                    ELSE json_array(property, printf('U+%04X', unicode(UCS)), UCS) END)
                FROM unihan_variant WHERE unihan_variant.value = @ucs))",
    },
    Field {
        name: "joyo",
        expr: "json((SELECT json_group_array(json_object('音訓', 音訓, '例', json(例), '備考', 備考))
                FROM joyo WHERE joyo.漢字 = @ucs))",
    },
    Field {
        name: "joyo_kangxi",
        expr: "json((SELECT json_group_array(康熙字典体) FROM joyo_kangxi WHERE joyo_kangxi.漢字 = @ucs))",
    },
    Field {
        name: "joyo_kangxi_inverse",
        expr: "json((SELECT json_group_array(漢字) FROM joyo_kangxi WHERE joyo_kangxi.康熙字典体 = @ucs))",
    },
    Field {
        name: "mji",
        expr: "json((SELECT json_group_array(json_object(
                    '文字', coalesce(実装したSVS, 実装したUCS, 実装したMoji_JohoコレクションIVS),
                    'MJ文字図形名', MJ文字図形名,
                    '対応するUCS', CASE WHEN 対応するUCS IS NOT NULL
                        THEN printf('U+%04X', unicode(対応するUCS)) END,
                    '実装したUCS', CASE WHEN 実装したUCS IS NOT NULL
                        THEN printf('U+%04X', unicode(実装したUCS)) END,
                    '実装したMoji_JohoコレクションIVS', CASE WHEN 実装したMoji_JohoコレクションIVS IS NOT NULL
                        THEN printf('%04X_%04X', unicode(実装したMoji_JohoコレクションIVS),
                            unicode(substr(実装したMoji_JohoコレクションIVS, 2))) END,
                    '実装したSVS', CASE WHEN 実装したSVS IS NOT NULL
                        THEN printf('%04X_%04X', unicode(実装したSVS), unicode(substr(実装したSVS, 2))) END,
                    '部首・内画数', json((SELECT json_group_array(json_array(部首, 内画数))
                        FROM mji_rsindex WHERE mji_rsindex.MJ文字図形名 = mji.MJ文字図形名)),
                    '総画数', 総画数,
                    '読み', json((SELECT json_group_array(読み)
                        FROM mji_reading WHERE mji_reading.MJ文字図形名 = mji.MJ文字図形名)),
                    '大漢和', 大漢和,
                    '更新履歴', json((SELECT json_group_array(更新履歴)
                        FROM mji_changelog WHERE mji_changelog.MJ文字図形名 = mji.MJ文字図形名)),
                    '備考', 備考,
                    'mjsm', json((SELECT json_group_array(json_array(
                            mjsm.表, printf('U+%04X', unicode(mjsm.縮退UCS)), mjsm.縮退UCS))
                        FROM mjsm
                        WHERE mji.MJ文字図形名 = mjsm.MJ文字図形名
                        ORDER BY mjsm.表, mjsm.順位, mjsm.ホップ数))))
                FROM mji
                WHERE mji.対応するUCS = @ucs OR mji.実装したUCS = @ucs))",
    },
    Field {
        name: "mjsm_inverse",
        expr: "json((SELECT json_group_array(json_object(
                    '表', mjsm.表,
                    '文字', coalesce(実装したSVS, 実装したUCS, 実装したMoji_JohoコレクションIVS),
                    'MJ文字図形名', mji.MJ文字図形名,
                    '対応するUCS', CASE WHEN 対応するUCS IS NOT NULL
                        THEN printf('U+%04X', unicode(対応するUCS)) END,
                    '実装したUCS', CASE WHEN 実装したUCS IS NOT NULL
                        THEN printf('U+%04X', unicode(実装したUCS)) END))
                FROM mji JOIN mjsm ON mji.MJ文字図形名 = mjsm.MJ文字図形名
                WHERE mjsm.縮退UCS = @ucs))",
    },
];

/// Names of all lookup fields, in response order.
pub fn field_names() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|f| f.name)
}

/// Build the lookup query for `selection`; an empty selection means every
/// field. Unknown names fail with the list of valid ones.
pub fn build_query(selection: &[String]) -> Result<String> {
    if selection
        .iter()
        .any(|s| !FIELDS.iter().any(|f| f.name == s))
    {
        return Err(Error::InvalidSelect {
            options: field_names().map(String::from).collect(),
        });
    }
    let columns = FIELDS
        .iter()
        .filter(|f| selection.is_empty() || selection.iter().any(|s| s == f.name))
        .map(|f| format!("'{}', {}", f.name, f.expr))
        .collect::<Vec<_>>()
        .join(",\n");
    Ok(format!("SELECT json_object(\n{columns}) AS vs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::fixture;

    fn lookup_text(ch: &str, select: &[&str]) -> String {
        let select: Vec<String> = select.iter().map(|s| s.to_string()).collect();
        let sql = build_query(&select).unwrap();
        fixture()
            .query_text(&sql, rusqlite::named_params! { "@ucs": ch })
            .unwrap()
            .unwrap()
    }

    fn lookup(ch: &str, select: &[&str]) -> serde_json::Value {
        serde_json::from_str(&lookup_text(ch, select)).unwrap()
    }

    #[test]
    fn field_names_unique() {
        let mut names: Vec<_> = field_names().collect();
        let n = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), n);
    }

    #[test]
    fn unknown_field_lists_options() {
        let err = build_query(&["char".into(), "nope".into()]).unwrap_err();
        assert_eq!(err.to_string(), "invalid select");
        match err {
            Error::InvalidSelect { options } => {
                assert_eq!(options.len(), FIELDS.len());
                assert_eq!(options[0], "char");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn selection_keeps_field_order() {
        let text = lookup_text("明", &["UCS", "char"]);
        assert_eq!(text, r#"{"char":"明","UCS":"U+660E"}"#);
    }

    #[test]
    fn nested_fields_are_json() {
        let v = lookup("明", &["ids", "aj1", "unihan", "joyo"]);
        assert_eq!(v["ids"][0]["IDS"], "⿰日月");
        assert_eq!(v["aj1"]["CID"], 3305);
        assert_eq!(v["unihan"]["kMandarin"], "míng");
        assert_eq!(v["joyo"][0]["例"][1], "説明");
    }

    #[test]
    fn mji_record() {
        let v = lookup("明", &["mji"]);
        let rec = &v["mji"][0];
        assert_eq!(rec["MJ文字図形名"], "MJ000008");
        assert_eq!(rec["総画数"], 8);
        assert_eq!(rec["読み"].as_array().unwrap().len(), 3);
        assert_eq!(rec["部首・内画数"][0][0], 72);
        assert_eq!(rec["mjsm"][0][1], "U+660E");
    }

    #[test]
    fn missing_data_is_empty_or_null() {
        let v = lookup("一", &["aj1", "ids", "joyo_kangxi"]);
        assert!(v["aj1"].is_null());
        assert_eq!(v["ids"], serde_json::json!([]));
        assert_eq!(v["joyo_kangxi"], serde_json::json!([]));
    }

    #[test]
    fn full_selection_has_every_field() {
        let v = lookup("豈", &[]);
        assert_eq!(v.as_object().unwrap().len(), FIELDS.len());
    }
}
