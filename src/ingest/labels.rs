/*-
 * ========================LICENSE_START=================================
 * waypost
 * %%
 * Copyright (C) 2024 the waypost authors
 * %%
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
 * THE SOFTWARE.
 * =========================LICENSE_END==================================
 */

//! Dotted-key label folding, shared by the docker-compose ingestor and
//! emitter. Implemented once, reused by both directions.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum LabelTree {
    Scalar(String),
    Map(BTreeMap<String, LabelTree>),
}

#[derive(Debug, Eq, PartialEq)]
pub struct LabelConflict {
    pub path: String,
}

impl fmt::Display for LabelConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "label path `{}` is used as both a scalar and a nested key",
            self.path
        )
    }
}

/// Fold a flat `traefik.*`-namespaced label map into a nested tree, one
/// level per `.`-separated path segment. A path that is used as a scalar
/// at one label and as a prefix of another is a conflict.
pub fn fold(labels: &BTreeMap<String, String>, namespace: &str) -> Result<LabelTree, LabelConflict> {
    let mut root = BTreeMap::new();
    let prefix = format!("{namespace}.");

    for (key, value) in labels {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        let segments: Vec<&str> = rest.split('.').collect();
        insert(&mut root, &segments, value, rest)?;
    }

    Ok(LabelTree::Map(root))
}

fn insert(
    node: &mut BTreeMap<String, LabelTree>,
    segments: &[&str],
    value: &str,
    full_path: &str,
) -> Result<(), LabelConflict> {
    let (head, rest) = segments.split_first().expect("at least one segment");
    if rest.is_empty() {
        match node.get(*head) {
            Some(LabelTree::Map(_)) => {
                return Err(LabelConflict {
                    path: full_path.to_string(),
                })
            }
            _ => {
                node.insert(head.to_string(), LabelTree::Scalar(value.to_string()));
            }
        }
        return Ok(());
    }

    let entry = node
        .entry(head.to_string())
        .or_insert_with(|| LabelTree::Map(BTreeMap::new()));
    match entry {
        LabelTree::Map(child) => insert(child, rest, value, full_path),
        LabelTree::Scalar(_) => Err(LabelConflict {
            path: full_path.to_string(),
        }),
    }
}

impl LabelTree {
    pub fn as_map(&self) -> Option<&BTreeMap<String, LabelTree>> {
        match self {
            LabelTree::Map(m) => Some(m),
            LabelTree::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            LabelTree::Scalar(s) => Some(s),
            LabelTree::Map(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&LabelTree> {
        self.as_map()?.get(key)
    }

    pub fn child_ids(&self) -> Vec<&String> {
        self.as_map().map(|m| m.keys().collect()).unwrap_or_default()
    }
}

/// Flatten a nested [`LabelTree`] back into dotted-key labels, the
/// inverse of [`fold`], used by the docker-compose emitter.
pub fn unfold(tree: &LabelTree, namespace: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    unfold_into(tree, namespace, &mut out);
    out
}

fn unfold_into(tree: &LabelTree, path: &str, out: &mut BTreeMap<String, String>) {
    match tree {
        LabelTree::Scalar(value) => {
            out.insert(path.to_string(), value.clone());
        }
        LabelTree::Map(children) => {
            for (key, child) in children {
                unfold_into(child, &format!("{path}.{key}"), out);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn folds_dotted_keys_into_nested_tree() {
        let mut labels = BTreeMap::new();
        labels.insert("traefik.enable".to_string(), "true".to_string());
        labels.insert(
            "traefik.http.routers.r.rule".to_string(),
            "Host(`x`)".to_string(),
        );
        labels.insert(
            "traefik.http.routers.r.service".to_string(),
            "s".to_string(),
        );

        let tree = fold(&labels, "traefik").unwrap();
        let routers = tree.get("http").unwrap().get("routers").unwrap();
        assert_eq!(
            routers.get("r").unwrap().get("rule").unwrap().as_scalar(),
            Some("Host(`x`)")
        );
    }

    #[test]
    fn scalar_and_subtree_conflict_is_reported() {
        let mut labels = BTreeMap::new();
        labels.insert("traefik.http.routers".to_string(), "oops".to_string());
        labels.insert(
            "traefik.http.routers.r.rule".to_string(),
            "Host(`x`)".to_string(),
        );

        let err = fold(&labels, "traefik").unwrap_err();
        assert_eq!(err.path, "http.routers.r.rule");
    }

    #[test]
    fn unfold_is_the_inverse_of_fold() {
        let mut labels = BTreeMap::new();
        labels.insert("traefik.enable".to_string(), "true".to_string());
        labels.insert(
            "traefik.http.routers.r.rule".to_string(),
            "Host(`x`)".to_string(),
        );

        let tree = fold(&labels, "traefik").unwrap();
        let roundtrip = unfold(&tree, "traefik");
        assert_eq!(roundtrip, labels);
    }
}
