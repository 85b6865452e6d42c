use polybench_common::types::Language;

/// Fixed base-image recipes, one per language that needs one
/// Instance Dockerfiles start `FROM polybench_<language>_base` and expect
/// the tree at /testbed; Python instances are self-contained and have no
/// recipe here

const JAVA_BASE: &str = r#"FROM ubuntu:22.04

ENV DEBIAN_FRONTEND=noninteractive

# Toolchain shared by every Java instance build
RUN apt-get update && apt-get install -y --no-install-recommends \
    git curl ca-certificates openjdk-17-jdk maven gradle \
    && rm -rf /var/lib/apt/lists/*

ENV JAVA_HOME=/usr/lib/jvm/java-17-openjdk-amd64

WORKDIR /testbed
"#;

const JAVASCRIPT_BASE: &str = r#"FROM node:20-bullseye

# git for repositories that resolve dependencies from source
RUN apt-get update && apt-get install -y --no-install-recommends git \
    && rm -rf /var/lib/apt/lists/* \
    && corepack enable

WORKDIR /testbed
"#;

const TYPESCRIPT_BASE: &str = r#"FROM node:20-bullseye

RUN apt-get update && apt-get install -y --no-install-recommends git \
    && rm -rf /var/lib/apt/lists/* \
    && corepack enable

# Install necessary tools
RUN npm install -g typescript ts-node

WORKDIR /testbed
"#;

/// Recipe for a language's base image
/// `None` exactly for the self-contained languages
pub fn base_dockerfile(language: Language) -> Option<&'static str> {
    match language {
        Language::Python => None,
        Language::Java => Some(JAVA_BASE),
        Language::JavaScript => Some(JAVASCRIPT_BASE),
        Language::TypeScript => Some(TYPESCRIPT_BASE),
    }
}
