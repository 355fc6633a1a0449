//! 文档查询语义：过滤条件匹配、更新操作符、字段投影
//!
//! 支持的过滤操作符：$eq $ne $gt $gte $lt $lte $in $nin $exists，以及顶层 $and / $or；
//! 字段名可用点号访问嵌套对象（如 "address.city"）。
//! 数组字段与标量相等比较时，只要数组中任一元素相等即匹配。

use std::cmp::Ordering;

use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

/// 按点号路径取字段
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return };
    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else { return };
        current = next;
    }
    current.insert(last.to_string(), value);
}

fn remove_path(doc: &mut Document, path: &str) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else { return };
    let mut current = doc;
    for part in parts {
        match current.get_mut(part) {
            Some(Value::Object(next)) => current = next,
            _ => return,
        }
    }
    current.remove(last);
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// 字段值等于目标；字段为数组时任一元素相等也算
fn field_equals(field: Option<&Value>, target: &Value) -> bool {
    match field {
        None => target.is_null(),
        Some(v) if values_equal(v, target) => true,
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, target)),
        Some(_) => false,
    }
}

fn is_operator_object(cond: &Value) -> bool {
    matches!(cond, Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')))
}

fn ordered(field: Option<&Value>, target: &Value, accept: fn(Ordering) -> bool) -> bool {
    match field {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare(item, target).is_some_and(accept)),
        Some(v) => compare(v, target).is_some_and(accept),
        None => false,
    }
}

fn eval_operator(field: Option<&Value>, op: &str, arg: &Value) -> Result<bool, String> {
    let ok = match op {
        "$eq" => field_equals(field, arg),
        "$ne" => !field_equals(field, arg),
        "$gt" => ordered(field, arg, |o| o == Ordering::Greater),
        "$gte" => ordered(field, arg, |o| o != Ordering::Less),
        "$lt" => ordered(field, arg, |o| o == Ordering::Less),
        "$lte" => ordered(field, arg, |o| o != Ordering::Greater),
        "$in" | "$nin" => {
            let Value::Array(options) = arg else {
                return Err(format!("{} needs an array", op));
            };
            let hit = options.iter().any(|o| field_equals(field, o));
            if op == "$in" {
                hit
            } else {
                !hit
            }
        }
        "$exists" => {
            let want = truthy(arg);
            field.is_some() == want
        }
        other => return Err(format!("unsupported query operator: {}", other)),
    };
    Ok(ok)
}

/// 判断文档是否满足过滤条件；空条件匹配所有文档
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, String> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" | "$or" => {
                let Value::Array(clauses) = cond else {
                    return Err(format!("{} needs an array of conditions", key));
                };
                let mut results = Vec::with_capacity(clauses.len());
                for clause in clauses {
                    let Value::Object(sub) = clause else {
                        return Err(format!("{} clauses must be objects", key));
                    };
                    results.push(matches(doc, sub)?);
                }
                if key == "$and" {
                    results.iter().all(|r| *r)
                } else {
                    results.iter().any(|r| *r)
                }
            }
            op if op.starts_with('$') => {
                return Err(format!("unsupported top-level operator: {}", op));
            }
            path => {
                let field = get_path(doc, path);
                match cond {
                    Value::Object(ops) if is_operator_object(cond) => {
                        let mut all = true;
                        for (op, arg) in ops {
                            if !eval_operator(field, op, arg)? {
                                all = false;
                                break;
                            }
                        }
                        all
                    }
                    _ => field_equals(field, cond),
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// 应用更新操作符（$set / $unset / $inc / $push），返回文档是否实际发生变化
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, String> {
    if update.is_empty() || !update.keys().all(|k| k.starts_with('$')) {
        return Err("update must only contain operators such as $set".to_string());
    }
    let before = doc.clone();
    for (op, fields) in update {
        let Value::Object(fields) = fields else {
            return Err(format!("{} needs an object", op));
        };
        for (path, value) in fields {
            if path == "_id" {
                return Err("_id cannot be modified".to_string());
            }
            match op.as_str() {
                "$set" => set_path(doc, path, value.clone()),
                "$unset" => remove_path(doc, path),
                "$inc" => {
                    let Some(delta) = value.as_f64() else {
                        return Err(format!("$inc value for {} must be a number", path));
                    };
                    let next = match get_path(doc, path) {
                        None => value.clone(),
                        Some(Value::Number(n)) => match (n.as_i64(), value.as_i64()) {
                            (Some(a), Some(b)) => match a.checked_add(b) {
                                Some(sum) => Value::from(sum),
                                None => return Err(format!("$inc on {} overflows", path)),
                            },
                            _ => Value::from(n.as_f64().unwrap_or_default() + delta),
                        },
                        Some(_) => return Err(format!("cannot $inc non-numeric field {}", path)),
                    };
                    set_path(doc, path, next);
                }
                "$push" => {
                    let mut items = match get_path(doc, path) {
                        None => Vec::new(),
                        Some(Value::Array(items)) => items.clone(),
                        Some(_) => return Err(format!("cannot $push to non-array field {}", path)),
                    };
                    items.push(value.clone());
                    set_path(doc, path, Value::Array(items));
                }
                other => return Err(format!("unsupported update operator: {}", other)),
            }
        }
    }
    Ok(*doc != before)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// 字段投影：包含模式（{"name": 1}）或排除模式（{"age": 0}）；_id 默认保留
pub fn project(doc: &Document, projection: &Document) -> Document {
    let include_mode = projection
        .iter()
        .any(|(k, v)| k != "_id" && truthy(v));
    let keep_id = projection.get("_id").map(truthy).unwrap_or(true);

    let mut out = Map::new();
    if include_mode {
        if keep_id {
            if let Some(id) = doc.get("_id") {
                out.insert("_id".to_string(), id.clone());
            }
        }
        for (path, flag) in projection {
            if path == "_id" || !truthy(flag) {
                continue;
            }
            if let Some(v) = get_path(doc, path) {
                set_path(&mut out, path, v.clone());
            }
        }
    } else {
        out = doc.clone();
        for (path, flag) in projection {
            if !truthy(flag) {
                remove_path(&mut out, path);
            }
        }
        if !keep_id {
            out.remove("_id");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_equality_and_nested_paths() {
        let d = doc(json!({"name": "Alice", "age": 30, "address": {"city": "Seoul"}, "tags": ["a", "b"]}));
        assert!(matches(&d, &doc(json!({}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": "Alice"}))).unwrap());
        assert!(matches(&d, &doc(json!({"address.city": "Seoul"}))).unwrap());
        assert!(matches(&d, &doc(json!({"tags": "b"}))).unwrap());
        assert!(matches(&d, &doc(json!({"age": 30.0}))).unwrap());
        assert!(!matches(&d, &doc(json!({"name": "Bob"}))).unwrap());
        assert!(matches(&d, &doc(json!({"missing": null}))).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let d = doc(json!({"age": 17, "name": "Kim"}));
        assert!(matches(&d, &doc(json!({"age": {"$lt": 18}}))).unwrap());
        assert!(matches(&d, &doc(json!({"age": {"$gte": 17, "$lte": 17}}))).unwrap());
        assert!(!matches(&d, &doc(json!({"age": {"$gt": 17}}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": {"$in": ["Kim", "Lee"]}}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": {"$nin": ["Lee"]}}))).unwrap());
        assert!(matches(&d, &doc(json!({"email": {"$exists": false}}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": {"$ne": "Lee"}}))).unwrap());
        // 类型不同不可比较
        assert!(!matches(&d, &doc(json!({"age": {"$gt": "10"}}))).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let d = doc(json!({"age": 40, "city": "Busan"}));
        let f = doc(json!({"$or": [{"city": "Seoul"}, {"age": {"$gt": 35}}]}));
        assert!(matches(&d, &f).unwrap());
        let f = doc(json!({"$and": [{"city": "Busan"}, {"age": {"$lt": 35}}]}));
        assert!(!matches(&d, &f).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let d = doc(json!({"a": 1}));
        assert!(matches(&d, &doc(json!({"a": {"$regex": "x"}}))).is_err());
        assert!(matches(&d, &doc(json!({"$where": "1"}))).is_err());
    }

    #[test]
    fn test_apply_update_operators() {
        let mut d = doc(json!({"_id": "1", "age": 30, "visits": 1.5, "tags": ["a"]}));
        let changed = apply_update(
            &mut d,
            &doc(json!({
                "$set": {"name": "Alice", "address.city": "Seoul"},
                "$inc": {"age": 1, "visits": 1},
                "$push": {"tags": "b"}
            })),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(d["age"], json!(31));
        assert_eq!(d["visits"], json!(2.5));
        assert_eq!(d["address"], json!({"city": "Seoul"}));
        assert_eq!(d["tags"], json!(["a", "b"]));

        let changed = apply_update(&mut d, &doc(json!({"$set": {"age": 31}}))).unwrap();
        assert!(!changed);
        apply_update(&mut d, &doc(json!({"$unset": {"address": ""}}))).unwrap();
        assert!(d.get("address").is_none());
    }

    #[test]
    fn test_inc_overflow_is_error() {
        let mut d = doc(json!({"_id": "1", "n": i64::MAX, "m": i64::MIN}));
        let err = apply_update(&mut d, &doc(json!({"$inc": {"n": 1}}))).unwrap_err();
        assert!(err.contains("overflows"));
        assert!(apply_update(&mut d, &doc(json!({"$inc": {"m": -1}}))).is_err());
        assert_eq!(d["n"], json!(i64::MAX));

        // 浮点增量不走整数加法
        apply_update(&mut d, &doc(json!({"$inc": {"n": 0.5}}))).unwrap();
        assert!(d["n"].is_f64());
    }

    #[test]
    fn test_apply_update_rejects_replacement_and_id() {
        let mut d = doc(json!({"_id": "1"}));
        assert!(apply_update(&mut d, &doc(json!({"name": "x"}))).is_err());
        assert!(apply_update(&mut d, &doc(json!({"$set": {"_id": "2"}}))).is_err());
    }

    #[test]
    fn test_projection_modes() {
        let d = doc(json!({"_id": "1", "name": "Alice", "age": 30}));
        assert_eq!(
            Value::Object(project(&d, &doc(json!({"name": 1, "_id": 0})))),
            json!({"name": "Alice"})
        );
        assert_eq!(
            Value::Object(project(&d, &doc(json!({"name": 1})))),
            json!({"_id": "1", "name": "Alice"})
        );
        assert_eq!(
            Value::Object(project(&d, &doc(json!({"age": 0})))),
            json!({"_id": "1", "name": "Alice"})
        );
    }
}
